//! The manifest tree model.
//!
//! A [`Node`] is a vertex of the virtual documentation tree: either a
//! **document** (it has at least one source, or has been renamed to
//! `_index.md`) or a **container** of further nodes. The tree is owned
//! top-down; no parent pointers are stored. Anything positional (relative
//! paths between documents, visibility of containers) is computed by the
//! engine after the tree is frozen.

use serde::{Deserialize, Serialize};

/// Property key marking a node as its container's index document.
pub const PROPERTY_INDEX: &str = "index";

/// Property key carrying manifest-authored frontmatter for a node.
pub const PROPERTY_FRONTMATTER: &str = "frontmatter";

/// Property key recording the source location a container was expanded
/// from, set by the manifest resolver when it consumes a node selector.
pub const PROPERTY_SOURCE_LOCATION: &str = "sourceLocation";

/// Reserved name of an index document inside a container.
pub const INDEX_NAME: &str = "_index.md";

/// A vertex of the manifest tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// File name of the produced document, or the container name.
    ///
    /// May contain the name expressions `$name`, `$ext` and `$uuid`, which
    /// are evaluated against the primary source during manifest resolution.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Primary source URI of the document's content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Additional source URIs appended after the primary one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multi_source: Vec<String>,

    /// Expansion directive resolved into child nodes at resolve time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<NodeSelector>,

    /// Arbitrary properties; carries the `index` flag and `frontmatter`.
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub properties: serde_yaml::Mapping,

    /// Child nodes, exclusively owned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

impl Node {
    /// Creates a document node with a name and a primary source.
    pub fn document(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            ..Self::default()
        }
    }

    /// Creates a container node with a name and children.
    pub fn container(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            nodes,
            ..Self::default()
        }
    }

    /// Whether this node produces a document file.
    pub fn is_document(&self) -> bool {
        self.source.is_some() || !self.multi_source.is_empty() || self.name == INDEX_NAME
    }

    /// Whether this node is a container of further nodes.
    pub fn is_container(&self) -> bool {
        !self.is_document() && (!self.nodes.is_empty() || self.node_selector.is_some())
    }

    /// All sources of the node in reading order: primary, then multi-source.
    pub fn sources(&self) -> Vec<String> {
        let mut sources = Vec::with_capacity(1 + self.multi_source.len());
        if let Some(source) = &self.source {
            sources.push(source.clone());
        }
        sources.extend(self.multi_source.iter().cloned());
        sources
    }

    /// Whether the node carries `index: true` in its properties.
    pub fn is_index(&self) -> bool {
        self.properties
            .get(PROPERTY_INDEX)
            .and_then(serde_yaml::Value::as_bool)
            .unwrap_or(false)
    }

    /// Manifest-authored frontmatter, if any.
    pub fn frontmatter(&self) -> Option<&serde_yaml::Value> {
        self.properties.get(PROPERTY_FRONTMATTER)
    }

    /// Looks up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Whether a container holds an `_index.md` document.
    pub fn has_index_child(&self) -> bool {
        self.nodes.iter().any(|n| n.name == INDEX_NAME)
    }
}

/// A directive to expand into a list of nodes at resolve time.
///
/// The `path` either names another manifest file (the expansion recurses
/// into it) or a directory in a source location (the handler lists it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    /// Path to another manifest or to a directory in a remote source.
    pub path: String,

    /// Maximum directory depth to descend into; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,

    /// Frontmatter-based include/exclude filters applied to candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<FrontmatterFilter>,

    /// Source paths excluded from the expansion (regular expressions).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,
}

/// Frontmatter include/exclude filters of a [`NodeSelector`].
///
/// Keys are `.`-separated paths into the frontmatter mapping; a candidate
/// is kept when every include entry matches and no exclude entry matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontmatterFilter {
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub include: std::collections::BTreeMap<String, serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub exclude: std::collections::BTreeMap<String, serde_yaml::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_and_container_classification() {
        let doc = Node::document("a.md", "https://host/repo/blob/main/a.md");
        assert!(doc.is_document());
        assert!(!doc.is_container());

        let container = Node::container("section", vec![doc.clone()]);
        assert!(container.is_container());
        assert!(!container.is_document());

        let index = Node {
            name: INDEX_NAME.to_string(),
            ..Node::default()
        };
        assert!(index.is_document());
    }

    #[test]
    fn sources_preserve_order() {
        let node = Node {
            name: "a.md".to_string(),
            source: Some("first".to_string()),
            multi_source: vec!["second".to_string(), "third".to_string()],
            ..Node::default()
        };
        assert_eq!(node.sources(), vec!["first", "second", "third"]);
    }

    #[test]
    fn index_flag_from_properties() {
        let yaml = "name: overview\nsource: https://host/repo/blob/main/overview.md\nproperties:\n  index: true\n";
        let node: Node = serde_yaml::from_str(yaml).unwrap();
        assert!(node.is_index());
    }

    #[test]
    fn selector_deserializes_camel_case() {
        let yaml = "path: https://host/repo/tree/main/docs\ndepth: 2\nexcludePaths:\n- internal/.*\n";
        let selector: NodeSelector = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(selector.depth, Some(2));
        assert_eq!(selector.exclude_paths, vec!["internal/.*"]);
    }
}
