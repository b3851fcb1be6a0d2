//! Manifest resolution.
//!
//! Expands an authored [`Manifest`] into a frozen tree: node selectors are
//! recursively expanded (into imported sub-manifests or handler-listed
//! directories), names are normalized, expanded children are merged with
//! explicit ones, and the result is validated. After
//! [`ManifestResolver::resolve`] returns, the structure never changes
//! again — workers only ever see snapshots of it.

mod filter;

use docloom_core::handler::{HandlerError, HandlerRegistry};
use docloom_core::manifest::{LinkRules, Manifest};
use docloom_core::node::{INDEX_NAME, Node, NodeSelector, PROPERTY_SOURCE_LOCATION};
use docloom_core::task::DocumentRef;
use docloom_core::urls;

use crate::document::merge_frontmatter;
use crate::hugo::HugoConfig;
use crate::link::evaluate_name_expression;

/// Tracing target for manifest resolution.
const TRACING_TARGET: &str = "docloom_engine::resolve";

/// Errors failing manifest resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Manifest imports loop back into an already-expanding manifest.
    #[error("cycle detected in manifest imports: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// Nothing remained after expansion and pruning.
    #[error("document structure is empty after resolution")]
    EmptyStructure,

    /// Two peers share a name.
    #[error("duplicate node name '{name}' under '{parent}'")]
    DuplicateName { parent: String, name: String },

    /// More than one peer carries `index: true`.
    #[error("multiple index documents under '{parent}'")]
    MultipleIndex { parent: String },

    /// A selector path or manifest location has no handler.
    #[error("no resource handler accepts '{0}'")]
    NoHandler(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// A fully expanded, validated manifest.
#[derive(Debug)]
pub struct ResolvedManifest {
    pub structure: Vec<Node>,
    pub links: Option<LinkRules>,
}

impl ResolvedManifest {
    /// Flattens the tree into document snapshots, in tree order.
    ///
    /// With `fold_frontmatter` (Hugo mode), container frontmatter is
    /// folded down into each document, child entries overriding parents.
    pub fn documents(&self, fold_frontmatter: bool) -> Vec<DocumentRef> {
        let mut documents = Vec::new();
        collect_documents(
            &self.structure,
            "",
            None,
            fold_frontmatter,
            &mut documents,
        );
        documents
    }
}

fn collect_documents(
    nodes: &[Node],
    path: &str,
    parent_frontmatter: Option<&serde_yaml::Value>,
    fold: bool,
    out: &mut Vec<DocumentRef>,
) {
    for node in nodes {
        let folded = if fold {
            fold_frontmatter(parent_frontmatter, node.frontmatter())
        } else {
            node.frontmatter().cloned()
        };

        if node.is_document() {
            out.push(DocumentRef {
                path: path.to_string(),
                name: node.name.clone(),
                sources: node.sources(),
                frontmatter: folded,
            });
        } else {
            let child_path = join(path, &node.name);
            collect_documents(&node.nodes, &child_path, folded.as_ref(), fold, out);
        }
    }
}

fn fold_frontmatter(
    parent: Option<&serde_yaml::Value>,
    own: Option<&serde_yaml::Value>,
) -> Option<serde_yaml::Value> {
    match (parent, own) {
        (None, None) => None,
        (Some(parent), None) => Some(parent.clone()),
        (None, Some(own)) => Some(own.clone()),
        (Some(parent), Some(own)) => {
            let mut merged = serde_yaml::Mapping::new();
            merge_frontmatter(&mut merged, parent);
            merge_frontmatter(&mut merged, own);
            Some(serde_yaml::Value::Mapping(merged))
        }
    }
}

/// Expands and validates manifests.
pub struct ManifestResolver {
    registry: HandlerRegistry,
    hugo: Option<HugoConfig>,
}

impl ManifestResolver {
    pub fn new(registry: HandlerRegistry, hugo: Option<HugoConfig>) -> Self {
        Self { registry, hugo }
    }

    /// Resolves a manifest loaded from `location`.
    pub async fn resolve(
        &self,
        manifest: Manifest,
        location: &str,
    ) -> Result<ResolvedManifest, ResolveError> {
        let Manifest {
            mut structure,
            node_selector,
            links,
        } = manifest;

        let mut chain = vec![location.to_string()];

        if let Some(selector) = node_selector {
            let (expanded, _) = self.expand_selector(&selector, location, &mut chain).await?;
            merge_children(&mut structure, expanded);
        }
        self.resolve_nodes(&mut structure, location, &mut chain)
            .await?;

        validate_structure(&mut structure, "")?;
        if let Some(hugo) = &self.hugo {
            promote_indexes(&mut structure, hugo);
        }
        prune_empty(&mut structure);

        if structure.is_empty() {
            return Err(ResolveError::EmptyStructure);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            location,
            roots = structure.len(),
            "manifest resolved"
        );
        Ok(ResolvedManifest { structure, links })
    }

    /// Normalizes names and expands selectors, depth first.
    async fn resolve_nodes(
        &self,
        nodes: &mut Vec<Node>,
        location: &str,
        chain: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        for node in nodes.iter_mut() {
            if node.is_document() {
                self.normalize_document_name(node);
            }
        }

        for node in nodes.iter_mut() {
            if let Some(selector) = node.node_selector.take() {
                let (expanded, source_location) =
                    Box::pin(self.expand_selector(&selector, location, chain)).await?;
                merge_children(&mut node.nodes, expanded);
                if let Some(source_location) = source_location {
                    node.properties.insert(
                        serde_yaml::Value::from(PROPERTY_SOURCE_LOCATION),
                        serde_yaml::Value::from(source_location),
                    );
                }
            }
            if !node.nodes.is_empty() {
                Box::pin(self.resolve_nodes(&mut node.nodes, location, chain)).await?;
            }
        }
        Ok(())
    }

    /// Expands one selector into child nodes.
    ///
    /// A selector naming another manifest recurses into it; anything else
    /// is listed by the handler, then filtered. The second return value is
    /// the directory location the nodes came from, when there is one.
    async fn expand_selector(
        &self,
        selector: &NodeSelector,
        location: &str,
        chain: &mut Vec<String>,
    ) -> Result<(Vec<Node>, Option<String>), ResolveError> {
        let path = if urls::is_absolute(&selector.path) || selector.path.starts_with('/') {
            selector.path.clone()
        } else {
            let handler = self
                .registry
                .get(location)
                .ok_or_else(|| ResolveError::NoHandler(location.to_string()))?;
            handler.build_abs_link(location, &selector.path)?
        };

        let handler = self
            .registry
            .get(&path)
            .ok_or_else(|| ResolveError::NoHandler(path.clone()))?;

        if let Some(manifest) = handler.resolve_documentation(&path).await? {
            if chain.contains(&path) {
                let mut cycle = chain.clone();
                cycle.push(path);
                return Err(ResolveError::Cycle { chain: cycle });
            }

            chain.push(path.clone());
            let Manifest {
                mut structure,
                node_selector,
                links: _,
            } = manifest;
            if let Some(inner) = node_selector {
                let (expanded, _) = Box::pin(self.expand_selector(&inner, &path, chain)).await?;
                merge_children(&mut structure, expanded);
            }
            Box::pin(self.resolve_nodes(&mut structure, &path, chain)).await?;
            chain.pop();

            tracing::debug!(
                target: TRACING_TARGET,
                manifest = %path,
                nodes = structure.len(),
                "sub-manifest expanded"
            );
            return Ok((structure, None));
        }

        let mut absolute_selector = selector.clone();
        absolute_selector.path = path;
        let mut nodes = handler.resolve_node_selector(&absolute_selector).await?;
        filter::apply_frontmatter_filters(&mut nodes, absolute_selector.frontmatter.as_ref());
        mark_source_location(&mut nodes, &absolute_selector.path);
        Ok((nodes, Some(absolute_selector.path)))
    }

    /// Evaluates name expressions and enforces the `.md` convention.
    fn normalize_document_name(&self, node: &mut Node) {
        let Some(source) = node.source.clone() else {
            return;
        };
        let (stem, ext) = match self.registry.get(&source) {
            Some(handler) => handler.resource_name(&source),
            None => urls::stem_and_extension(&source),
        };

        let mut name = if node.name.is_empty() {
            format!("{stem}{ext}")
        } else {
            evaluate_name_expression(&node.name, &stem, &ext)
        };
        if !name.contains('.') {
            name.push_str(".md");
        }
        node.name = name;
    }
}

/// Records where a container's children were expanded from, so links to
/// the directory itself can be matched intra-tree later.
fn mark_source_location(nodes: &mut [Node], path: &str) {
    for node in nodes.iter_mut() {
        if !node.is_document() {
            let child_location = format!("{}/{}", path.trim_end_matches('/'), node.name);
            mark_source_location(&mut node.nodes, &child_location);
            node.properties.insert(
                serde_yaml::Value::from(PROPERTY_SOURCE_LOCATION),
                serde_yaml::Value::from(child_location),
            );
        }
    }
}

/// Merges expanded children into explicit ones by name.
///
/// Containers of the same name union recursively; a document name
/// collision is won by the node already present (explicit definitions
/// come first).
fn merge_children(existing: &mut Vec<Node>, incoming: Vec<Node>) {
    for node in incoming {
        match existing.iter_mut().find(|present| present.name == node.name) {
            None => existing.push(node),
            Some(present) if !present.is_document() && !node.is_document() => {
                merge_children(&mut present.nodes, node.nodes);
            }
            Some(_) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    name = %node.name,
                    "explicit node shadows expanded duplicate"
                );
            }
        }
    }
}

/// Enforces peer-uniqueness and the single-index rule; renames index
/// documents to `_index.md`.
fn validate_structure(nodes: &mut Vec<Node>, parent: &str) -> Result<(), ResolveError> {
    let index_count = nodes.iter().filter(|node| node.is_index()).count();
    if index_count > 1 {
        return Err(ResolveError::MultipleIndex {
            parent: display_parent(parent),
        });
    }
    if let Some(node) = nodes.iter_mut().find(|node| node.is_index()) {
        node.name = INDEX_NAME.to_string();
    }

    let mut seen = std::collections::HashSet::new();
    for node in nodes.iter() {
        if !seen.insert(node.name.as_str()) {
            return Err(ResolveError::DuplicateName {
                parent: display_parent(parent),
                name: node.name.clone(),
            });
        }
    }

    for node in nodes.iter_mut() {
        if !node.is_document() {
            let child_path = join(parent, &node.name);
            validate_structure(&mut node.nodes, &child_path)?;
        }
    }
    Ok(())
}

/// Promotes the first index-candidate child of index-less containers.
fn promote_indexes(nodes: &mut [Node], hugo: &HugoConfig) {
    for node in nodes.iter_mut() {
        if node.is_document() {
            continue;
        }
        if !node.has_index_child()
            && let Some(candidate) = node
                .nodes
                .iter_mut()
                .find(|child| child.is_document() && hugo.is_index_candidate(&child.name))
        {
            tracing::debug!(
                target: TRACING_TARGET,
                container = %node.name,
                promoted = %candidate.name,
                "promoting index document"
            );
            candidate.name = INDEX_NAME.to_string();
        }
        promote_indexes(&mut node.nodes, hugo);
    }
}

/// Drops containers that ended up with nothing in them.
fn prune_empty(nodes: &mut Vec<Node>) {
    for node in nodes.iter_mut() {
        prune_empty(&mut node.nodes);
    }
    nodes.retain(|node| {
        let keep = node.is_document() || !node.nodes.is_empty();
        if !keep {
            tracing::warn!(target: TRACING_TARGET, name = %node.name, "pruning empty node");
        }
        keep
    });
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}/{name}")
    }
}

fn display_parent(parent: &str) -> String {
    if parent.is_empty() {
        "the manifest root".to_string()
    } else {
        parent.to_string()
    }
}
