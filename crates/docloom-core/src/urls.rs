//! URL canonicalization and link-destination helpers.
//!
//! Canonicalized URLs (`scheme://host/path`, no query, fragment or
//! userinfo, no trailing slash) are the dedup keys for link validation and
//! intra-tree matching. Sources that are not URLs (plain filesystem paths)
//! canonicalize to their lexically normalized form so both kinds share one
//! key space.

use url::Url;

/// Whether a destination is an absolute URI (carries a scheme).
pub fn is_absolute(uri: &str) -> bool {
    Url::parse(uri).is_ok()
}

/// Canonicalizes a URI to its dedup key.
///
/// Absolute URLs become `scheme://host/path` with query, fragment and
/// userinfo discarded and any trailing slash trimmed. Everything else is
/// treated as a path and lexically normalized.
pub fn canonical(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) if url.has_host() => {
            let mut key = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
            if let Some(port) = url.port() {
                key.push(':');
                key.push_str(&port.to_string());
            }
            let path = url.path().trim_end_matches('/');
            key.push_str(path);
            key
        }
        Ok(url) => {
            // Scheme without authority, e.g. file: or mailto:.
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => normalize_path(uri),
    }
}

/// Splits a destination into its base and a `?query#fragment` suffix.
pub fn split_suffix(destination: &str) -> (&str, &str) {
    match destination.find(['?', '#']) {
        Some(at) => destination.split_at(at),
        None => (destination, ""),
    }
}

/// Lexically normalizes a `/`-separated path: collapses `.`, `..` and
/// repeated separators without touching the filesystem.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&p) if p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Splits a path into a name stem and extension (with dot).
pub fn stem_and_extension(path: &str) -> (String, String) {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (name, _) = split_suffix(name);
    match name.rfind('.') {
        Some(at) if at > 0 => (name[..at].to_string(), name[at..].to_string()),
        _ => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strips_query_fragment_and_userinfo() {
        assert_eq!(
            canonical("https://user:pw@host/org/repo/blob/v1/docs/x.md?raw=1#top"),
            "https://host/org/repo/blob/v1/docs/x.md"
        );
    }

    #[test]
    fn canonical_trims_trailing_slash() {
        assert_eq!(canonical("https://host/docs/"), "https://host/docs");
        assert_eq!(canonical("https://host/"), "https://host");
    }

    #[test]
    fn canonical_keeps_explicit_port() {
        assert_eq!(canonical("http://host:8080/a"), "http://host:8080/a");
    }

    #[test]
    fn canonical_normalizes_plain_paths() {
        assert_eq!(canonical("docs/./a/../b.md"), "docs/b.md");
        assert_eq!(canonical("/docs//b.md"), "/docs/b.md");
    }

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("https://host/x"));
        assert!(is_absolute("mailto:a@b"));
        assert!(!is_absolute("./image.png"));
        assert!(!is_absolute("docs/x.md"));
    }

    #[test]
    fn suffix_split() {
        assert_eq!(split_suffix("a.md#sec"), ("a.md", "#sec"));
        assert_eq!(split_suffix("a.md?x=1#sec"), ("a.md", "?x=1#sec"));
        assert_eq!(split_suffix("a.md"), ("a.md", ""));
    }

    #[test]
    fn stem_extension_split() {
        assert_eq!(
            stem_and_extension("https://host/docs/image.png"),
            ("image".to_string(), ".png".to_string())
        );
        assert_eq!(
            stem_and_extension("archive.tar.gz"),
            ("archive.tar".to_string(), ".gz".to_string())
        );
        assert_eq!(
            stem_and_extension("LICENSE"),
            ("LICENSE".to_string(), String::new())
        );
    }

    #[test]
    fn parent_traversal_stops_at_root() {
        assert_eq!(normalize_path("/a/../../b"), "/b");
        assert_eq!(normalize_path("../a/b"), "../a/b");
    }
}
