//! Frontmatter filtering of selector-expanded nodes.

use docloom_core::node::{FrontmatterFilter, Node};

/// Drops expanded document nodes failing the selector's frontmatter
/// filters. Containers are kept; their children are filtered recursively.
pub fn apply_frontmatter_filters(nodes: &mut Vec<Node>, filter: Option<&FrontmatterFilter>) {
    let Some(filter) = filter else {
        return;
    };
    retain_matching(nodes, filter);
}

fn retain_matching(nodes: &mut Vec<Node>, filter: &FrontmatterFilter) {
    nodes.retain(|node| !node.is_document() || matches(node.frontmatter(), filter));
    for node in nodes.iter_mut() {
        retain_matching(&mut node.nodes, filter);
    }
}

fn matches(frontmatter: Option<&serde_yaml::Value>, filter: &FrontmatterFilter) -> bool {
    filter
        .include
        .iter()
        .all(|(path, expected)| lookup(frontmatter, path) == Some(expected))
        && !filter
            .exclude
            .iter()
            .any(|(path, expected)| lookup(frontmatter, path) == Some(expected))
}

/// Resolves a `.`-separated path into a frontmatter value.
fn lookup<'a>(value: Option<&'a serde_yaml::Value>, path: &str) -> Option<&'a serde_yaml::Value> {
    let mut current = value?;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use docloom_core::node::PROPERTY_FRONTMATTER;

    use super::*;

    fn doc_with_frontmatter(name: &str, yaml: &str) -> Node {
        let mut node = Node::document(name, format!("https://host/{name}"));
        node.properties.insert(
            serde_yaml::Value::from(PROPERTY_FRONTMATTER),
            serde_yaml::from_str(yaml).unwrap(),
        );
        node
    }

    fn filter(include: &[(&str, &str)], exclude: &[(&str, &str)]) -> FrontmatterFilter {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), serde_yaml::Value::from(*v)))
                .collect::<BTreeMap<_, _>>()
        };
        FrontmatterFilter {
            include: to_map(include),
            exclude: to_map(exclude),
        }
    }

    #[test]
    fn include_filters_keep_matching_documents() {
        let mut nodes = vec![
            doc_with_frontmatter("a.md", "audience: user\n"),
            doc_with_frontmatter("b.md", "audience: operator\n"),
        ];
        apply_frontmatter_filters(&mut nodes, Some(&filter(&[("audience", "user")], &[])));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "a.md");
    }

    #[test]
    fn exclude_filters_drop_matching_documents() {
        let mut nodes = vec![
            doc_with_frontmatter("a.md", "draft: yes\n"),
            doc_with_frontmatter("b.md", "draft: no\n"),
        ];
        apply_frontmatter_filters(&mut nodes, Some(&filter(&[], &[("draft", "yes")])));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "b.md");
    }

    #[test]
    fn dotted_paths_descend() {
        let mut nodes = vec![
            doc_with_frontmatter("a.md", "menu:\n  section: guides\n"),
            doc_with_frontmatter("b.md", "menu:\n  section: internals\n"),
        ];
        apply_frontmatter_filters(&mut nodes, Some(&filter(&[("menu.section", "guides")], &[])));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "a.md");
    }

    #[test]
    fn containers_filter_recursively() {
        let mut nodes = vec![Node::container(
            "sub",
            vec![
                doc_with_frontmatter("a.md", "audience: user\n"),
                doc_with_frontmatter("b.md", "audience: operator\n"),
            ],
        )];
        apply_frontmatter_filters(&mut nodes, Some(&filter(&[("audience", "user")], &[])));
        assert_eq!(nodes[0].nodes.len(), 1);
    }

    #[test]
    fn missing_frontmatter_fails_include() {
        let mut nodes = vec![Node::document("a.md", "https://host/a.md")];
        apply_frontmatter_filters(&mut nodes, Some(&filter(&[("audience", "user")], &[])));
        assert!(nodes.is_empty());
    }
}
