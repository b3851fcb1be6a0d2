//! Compiled manifest link rules.

use docloom_core::manifest::{LinkRules, RewriteRule};
use regex::Regex;

use super::LinkError;

/// Manifest link rules with download-scope and rename patterns compiled.
#[derive(Debug, Default)]
pub struct CompiledLinkRules {
    rewrites: Vec<(String, RewriteRule)>,
    scope: Vec<Regex>,
    renames: Vec<(Regex, String)>,
}

impl CompiledLinkRules {
    /// Compiles the authored rules, rejecting malformed patterns.
    pub fn compile(rules: Option<&LinkRules>) -> Result<Self, LinkError> {
        let Some(rules) = rules else {
            return Ok(Self::default());
        };

        let mut rewrites: Vec<(String, RewriteRule)> = rules
            .rewrites
            .iter()
            .map(|(prefix, rule)| (prefix.clone(), rule.clone()))
            .collect();
        // Longest prefix first so the most specific rule wins.
        rewrites.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

        let mut scope = Vec::new();
        let mut renames = Vec::new();
        if let Some(downloads) = &rules.downloads {
            for pattern in &downloads.scope {
                scope.push(compile_pattern(pattern)?);
            }
            for (pattern, name) in &downloads.renames {
                renames.push((compile_pattern(pattern)?, name.clone()));
            }
        }

        Ok(Self {
            rewrites,
            scope,
            renames,
        })
    }

    /// The most specific rewrite rule whose prefix matches the link.
    pub fn rewrite_for(&self, abs_link: &str) -> Option<&RewriteRule> {
        self.rewrites
            .iter()
            .find(|(prefix, _)| abs_link.starts_with(prefix.as_str()))
            .map(|(_, rule)| rule)
    }

    /// Whether the absolute link falls inside the download scope.
    pub fn in_download_scope(&self, abs_link: &str) -> bool {
        self.scope.iter().any(|pattern| pattern.is_match(abs_link))
    }

    /// Name expression overriding the generated resource name, if any.
    pub fn rename_for(&self, abs_link: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|(pattern, _)| pattern.is_match(abs_link))
            .map(|(_, name)| name.as_str())
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, LinkError> {
    Regex::new(pattern).map_err(|source| LinkError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use docloom_core::manifest::DownloadRules;

    use super::*;

    fn rules() -> LinkRules {
        let mut rewrites = BTreeMap::new();
        rewrites.insert(
            "https://host/old/".to_string(),
            RewriteRule {
                destination: Some(String::new()),
            },
        );
        rewrites.insert(
            "https://host/old/keep/".to_string(),
            RewriteRule {
                destination: Some("https://host/new/keep/".to_string()),
            },
        );
        LinkRules {
            rewrites,
            downloads: Some(DownloadRules {
                scope: vec!["https://host/org/.*".to_string()],
                renames: BTreeMap::new(),
            }),
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let compiled = CompiledLinkRules::compile(Some(&rules())).unwrap();

        let rule = compiled.rewrite_for("https://host/old/keep/x.md").unwrap();
        assert_eq!(rule.destination.as_deref(), Some("https://host/new/keep/"));

        let rule = compiled.rewrite_for("https://host/old/drop/x.md").unwrap();
        assert!(rule.is_delete());

        assert!(compiled.rewrite_for("https://host/other/x.md").is_none());
    }

    #[test]
    fn scope_matching() {
        let compiled = CompiledLinkRules::compile(Some(&rules())).unwrap();
        assert!(compiled.in_download_scope("https://host/org/repo/image.png"));
        assert!(!compiled.in_download_scope("https://elsewhere/image.png"));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let rules = LinkRules {
            rewrites: BTreeMap::new(),
            downloads: Some(DownloadRules {
                scope: vec!["[unclosed".to_string()],
                renames: BTreeMap::new(),
            }),
        };
        assert!(CompiledLinkRules::compile(Some(&rules)).is_err());
    }
}
