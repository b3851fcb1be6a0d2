//! Document positions and the source index.
//!
//! After the manifest tree is frozen, a single-threaded prepare pass maps
//! every canonicalized source to the tree positions it feeds. Document
//! workers then resolve intra-tree links against this read-only index, so
//! no tree structure is ever shared with workers.

use std::collections::HashMap;

use docloom_core::node::{INDEX_NAME, Node, PROPERTY_SOURCE_LOCATION};
use docloom_core::urls;

/// A position a link may be rewritten to.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    /// `/`-separated position of the target document, e.g. `guides/x.md`.
    pub position: String,
    /// `frontmatter.url` override from the manifest, honored in Hugo mode.
    pub url_override: Option<String>,
}

/// Read-only map of canonicalized sources to tree positions.
#[derive(Debug, Default)]
pub struct SourceIndex {
    by_source: HashMap<String, Vec<LinkTarget>>,
}

impl SourceIndex {
    /// Builds the index over a resolved structure.
    ///
    /// Documents are registered under each of their sources. Containers
    /// expanded from a node selector are registered under the selector's
    /// source location and resolve to their `_index.md` when they have
    /// one, otherwise to the nearest visible ancestor — containers without
    /// an index along the chain stay unregistered, since nothing can link
    /// to them.
    pub fn build(structure: &[Node]) -> Self {
        let mut index = Self::default();
        Self::walk(structure, "", None, &mut index);
        index
    }

    fn walk(nodes: &[Node], path: &str, visible_index: Option<&str>, index: &mut Self) {
        for node in nodes {
            let position = join(path, &node.name);
            if node.is_document() {
                let url_override = frontmatter_url(node);
                for source in node.sources() {
                    index
                        .by_source
                        .entry(urls::canonical(&source))
                        .or_default()
                        .push(LinkTarget {
                            position: position.clone(),
                            url_override: url_override.clone(),
                        });
                }
            } else {
                let own_index = node
                    .has_index_child()
                    .then(|| join(&position, INDEX_NAME));
                let visible = own_index.as_deref().or(visible_index);

                if let Some(location) = source_location(node)
                    && let Some(target) = visible
                {
                    index
                        .by_source
                        .entry(urls::canonical(location))
                        .or_default()
                        .push(LinkTarget {
                            position: target.to_string(),
                            url_override: None,
                        });
                }

                Self::walk(&node.nodes, &position, visible, index);
            }
        }
    }

    /// Positions registered for a canonicalized source.
    pub fn lookup(&self, canonical: &str) -> &[LinkTarget] {
        self.by_source
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Picks the best target relative to `from` and returns it with the
    /// computed relative path.
    ///
    /// The shortest relative path wins; ties prefer descending paths over
    /// ascending ones.
    pub fn choose<'a>(
        &'a self,
        canonical: &str,
        from: &str,
    ) -> Option<(&'a LinkTarget, String)> {
        self.lookup(canonical)
            .iter()
            .map(|target| {
                let rel = relative_path(from, &target.position);
                (target, rel)
            })
            .min_by_key(|(_, rel)| {
                let segments = rel.split('/').count();
                let ascending = rel.starts_with("..");
                (segments, ascending)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}/{name}")
    }
}

fn frontmatter_url(node: &Node) -> Option<String> {
    node.frontmatter()?
        .get("url")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string)
}

fn source_location(node: &Node) -> Option<&str> {
    node.properties
        .get(PROPERTY_SOURCE_LOCATION)
        .and_then(serde_yaml::Value::as_str)
}

/// Computes the relative path from one tree position to another.
///
/// Both arguments are `/`-separated positions including file names.
pub fn relative_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut parts: Vec<&str> = from.split('/').collect();
        parts.pop();
        parts
    };
    let to_parts: Vec<&str> = to.split('/').collect();

    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from_dir.len() - common;
    let mut segments: Vec<&str> = Vec::with_capacity(ups + to_parts.len() - common);
    segments.extend(std::iter::repeat_n("..", ups));
    segments.extend(&to_parts[common..]);
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use docloom_core::node::Node;

    use super::*;

    #[test]
    fn relative_path_descends() {
        assert_eq!(relative_path("README.md", "sub/x.md"), "sub/x.md");
        assert_eq!(relative_path("docs/a.md", "docs/sub/x.md"), "sub/x.md");
    }

    #[test]
    fn relative_path_ascends() {
        assert_eq!(relative_path("docs/sub/x.md", "README.md"), "../../README.md");
        assert_eq!(relative_path("a/b.md", "c/d.md"), "../c/d.md");
    }

    #[test]
    fn relative_path_between_siblings() {
        assert_eq!(relative_path("docs/a.md", "docs/b.md"), "b.md");
    }

    fn doc(name: &str, source: &str) -> Node {
        Node::document(name, source)
    }

    #[test]
    fn index_registers_every_source() {
        let structure = vec![
            doc("a.md", "https://host/repo/blob/v1/docs/a.md"),
            Node::container(
                "sub",
                vec![doc("x.md", "https://host/repo/blob/v1/docs/sub/x.md")],
            ),
        ];
        let index = SourceIndex::build(&structure);

        let targets = index.lookup("https://host/repo/blob/v1/docs/sub/x.md");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].position, "sub/x.md");
    }

    #[test]
    fn choose_prefers_shortest_path() {
        let structure = vec![
            Node::container("left", vec![doc("x.md", "https://host/one/x.md")]),
            doc("y.md", "ignored"),
        ];
        let mut index = SourceIndex::build(&structure);
        // Register a second position for the same source, one level up.
        index
            .by_source
            .get_mut("https://host/one/x.md")
            .unwrap()
            .push(LinkTarget {
                position: "x.md".to_string(),
                url_override: None,
            });

        // From left/y.md the sibling "x.md" beats "../x.md".
        let (_, rel) = index.choose("https://host/one/x.md", "left/y.md").unwrap();
        assert_eq!(rel, "x.md");
    }

    #[test]
    fn choose_prefers_descending_on_tie() {
        let structure = vec![
            Node::container(
                "b",
                vec![
                    Node::container("c", vec![doc("x.md", "https://host/two/x.md")]),
                    doc("y.md", "ignored"),
                ],
            ),
            doc("x.md", "https://host/two/x.md"),
        ];
        let index = SourceIndex::build(&structure);

        // From b/y.md both "c/x.md" and "../x.md" are two segments; the
        // descending path wins the tie.
        let (_, rel) = index.choose("https://host/two/x.md", "b/y.md").unwrap();
        assert_eq!(rel, "c/x.md");
    }

    #[test]
    fn container_with_index_resolves_to_it() {
        let mut container = Node::container(
            "guides",
            vec![doc(INDEX_NAME, "https://host/repo/blob/v1/guides/README.md")],
        );
        container.properties.insert(
            serde_yaml::Value::from(PROPERTY_SOURCE_LOCATION),
            serde_yaml::Value::from("https://host/repo/tree/v1/guides"),
        );
        let index = SourceIndex::build(&[container]);

        let targets = index.lookup("https://host/repo/tree/v1/guides");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].position, "guides/_index.md");
    }

    #[test]
    fn container_without_index_is_unregistered() {
        let mut container =
            Node::container("guides", vec![doc("a.md", "https://host/repo/blob/v1/a.md")]);
        container.properties.insert(
            serde_yaml::Value::from(PROPERTY_SOURCE_LOCATION),
            serde_yaml::Value::from("https://host/repo/tree/v1/guides"),
        );
        let index = SourceIndex::build(&[container]);
        assert!(index.lookup("https://host/repo/tree/v1/guides").is_empty());
    }
}
