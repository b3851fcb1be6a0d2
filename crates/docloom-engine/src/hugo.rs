//! Hugo-flavored output conventions.
//!
//! When Hugo mode is on, intra-tree links are converted to site-root
//! paths instead of relative file paths, `_index.md` documents collapse
//! into their section URL, and downloaded resources are addressed from
//! the site base URL.

/// Hugo output configuration.
#[derive(Debug, Clone)]
pub struct HugoConfig {
    /// Directory-style URLs (`/a/b/`) versus `.html` file URLs.
    pub pretty_urls: bool,
    /// Site base URL prepended to resource paths.
    pub base_url: String,
    /// Candidate names promoted to `_index.md` in containers without one,
    /// matched case-insensitively against the file stem.
    pub index_file_names: Vec<String>,
}

impl Default for HugoConfig {
    fn default() -> Self {
        Self {
            pretty_urls: true,
            base_url: String::new(),
            index_file_names: vec![
                "readme".to_string(),
                "read.me".to_string(),
                "index".to_string(),
            ],
        }
    }
}

impl HugoConfig {
    /// Converts a tree position into its site URL.
    pub fn site_path(&self, position: &str, url_override: Option<&str>) -> String {
        if let Some(url) = url_override {
            return url.to_string();
        }

        let path = position.strip_suffix(".md").unwrap_or(position);
        let path = match path.strip_suffix("_index") {
            Some(stripped) => stripped.trim_end_matches('/'),
            None => path,
        };

        if self.pretty_urls {
            if path.is_empty() {
                "/".to_string()
            } else {
                format!("/{path}/")
            }
        } else if path.is_empty() {
            "/index.html".to_string()
        } else {
            format!("/{path}.html")
        }
    }

    /// Converts a resource output path into its site URL.
    pub fn resource_path(&self, path: &str) -> String {
        let mut trimmed = path;
        while let Some(rest) = trimmed.strip_prefix("../") {
            trimmed = rest;
        }
        let trimmed = trimmed.trim_start_matches('/');
        format!("{}/{trimmed}", self.base_url.trim_end_matches('/'))
    }

    /// Whether a file stem names an index-document candidate.
    pub fn is_index_candidate(&self, name: &str) -> bool {
        let stem = name.strip_suffix(".md").unwrap_or(name);
        self.index_file_names
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_site_paths() {
        let hugo = HugoConfig::default();
        assert_eq!(hugo.site_path("guides/setup.md", None), "/guides/setup/");
        assert_eq!(hugo.site_path("guides/_index.md", None), "/guides/");
        assert_eq!(hugo.site_path("_index.md", None), "/");
    }

    #[test]
    fn ugly_site_paths() {
        let hugo = HugoConfig {
            pretty_urls: false,
            ..HugoConfig::default()
        };
        assert_eq!(hugo.site_path("guides/setup.md", None), "/guides/setup.html");
        assert_eq!(hugo.site_path("_index.md", None), "/index.html");
    }

    #[test]
    fn url_override_wins() {
        let hugo = HugoConfig::default();
        assert_eq!(
            hugo.site_path("guides/setup.md", Some("/custom/place/")),
            "/custom/place/"
        );
    }

    #[test]
    fn resource_paths_lose_parent_traversal() {
        let hugo = HugoConfig {
            base_url: "https://docs.example".to_string(),
            ..HugoConfig::default()
        };
        assert_eq!(
            hugo.resource_path("../../__resources/logo_ab12cd.png"),
            "https://docs.example/__resources/logo_ab12cd.png"
        );
    }

    #[test]
    fn index_candidates_match_case_insensitively() {
        let hugo = HugoConfig::default();
        assert!(hugo.is_index_candidate("README.md"));
        assert!(hugo.is_index_candidate("index.md"));
        assert!(!hugo.is_index_candidate("overview.md"));
    }
}
