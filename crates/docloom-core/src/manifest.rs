//! The manifest document model.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::{Node, NodeSelector};

/// Root of an authored manifest.
///
/// The resolved form produced by the engine has `node_selector` absent and
/// every selector in `structure` expanded into concrete nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Ordered root nodes of the documentation tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structure: Vec<Node>,

    /// Optional selector expanded into additional root nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<NodeSelector>,

    /// Link rewrite and download-scope rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkRules>,
}

impl Manifest {
    /// Parses a manifest from YAML bytes.
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        Ok(serde_yaml::from_slice(data)?)
    }
}

/// Link handling rules authored alongside the structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRules {
    /// URL-prefix keyed rewrite rules; the longest matching prefix wins.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub rewrites: std::collections::BTreeMap<String, RewriteRule>,

    /// Scope and naming of embedded-resource downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<DownloadRules>,
}

/// A single rewrite rule.
///
/// An empty destination is the delete-link directive: links matching the
/// prefix are erased from the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl RewriteRule {
    /// Whether this rule deletes matching links instead of rewriting them.
    pub fn is_delete(&self) -> bool {
        matches!(self.destination.as_deref(), Some(""))
    }
}

/// Which remote locations' embedded assets are fetched and re-hosted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRules {
    /// Regular expressions over absolute source URLs; a match places the
    /// source in download scope.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,

    /// Regular-expression keyed overrides of the generated resource name.
    ///
    /// Values are name expressions evaluated against the matched source
    /// (`$name`, `$ext`, `$uuid`).
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub renames: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
structure:
- name: docs
  nodes:
  - name: overview.md
    source: https://host/org/repo/blob/main/docs/overview.md
  - nodeSelector:
      path: https://host/org/repo/tree/main/docs/guides
links:
  rewrites:
    https://host/org/old-repo/:
      destination: \"\"
  downloads:
    scope:
    - https://host/org/.*
";

    #[test]
    fn parse_full_manifest() {
        let manifest = Manifest::from_yaml(MANIFEST.as_bytes()).unwrap();
        assert_eq!(manifest.structure.len(), 1);

        let docs = &manifest.structure[0];
        assert_eq!(docs.name, "docs");
        assert_eq!(docs.nodes.len(), 2);
        assert!(docs.nodes[1].node_selector.is_some());

        let links = manifest.links.unwrap();
        assert!(links.rewrites["https://host/org/old-repo/"].is_delete());
        assert_eq!(links.downloads.unwrap().scope, vec!["https://host/org/.*"]);
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        assert!(Manifest::from_yaml(b"structure: 17").is_err());
    }

    #[test]
    fn rewrite_rule_without_destination_is_not_delete() {
        let rule = RewriteRule { destination: None };
        assert!(!rule.is_delete());
        let rule = RewriteRule {
            destination: Some("https://host/new".to_string()),
        };
        assert!(!rule.is_delete());
    }
}
