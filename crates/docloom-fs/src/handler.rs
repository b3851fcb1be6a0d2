//! Filesystem resource handler.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use docloom_core::handler::{HandlerError, HandlerResult, ResourceHandler};
use docloom_core::manifest::Manifest;
use docloom_core::node::{Node, NodeSelector, PROPERTY_FRONTMATTER};
use docloom_core::urls;
use regex::Regex;

/// Tracing target for filesystem access.
const TRACING_TARGET: &str = "docloom_fs::handler";

/// Serves documentation content from the local filesystem.
///
/// Accepts plain paths and `file://` URIs. Directory node selectors
/// expand into the on-disk tree; `.yaml`/`.yml` selector paths resolve as
/// sub-manifests; provenance records are synthesized from file metadata.
#[derive(Debug, Clone, Default)]
pub struct FsHandler;

impl FsHandler {
    pub fn new() -> Self {
        Self
    }

    async fn walk_directory(
        &self,
        dir: &Path,
        depth_left: Option<u32>,
        excludes: &[Regex],
        want_frontmatter: bool,
    ) -> HandlerResult<Vec<Node>> {
        let mut reader = tokio::fs::read_dir(dir)
            .await
            .map_err(|err| io_error(&dir.to_string_lossy(), err))?;

        let mut entries: Vec<(String, PathBuf, bool)> = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| io_error(&dir.to_string_lossy(), err))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| io_error(&entry.path().to_string_lossy(), err))?;
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                entry.path(),
                file_type.is_dir(),
            ));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut nodes = Vec::new();
        for (name, path, is_dir) in entries {
            let path_str = path.to_string_lossy().into_owned();
            if excludes.iter().any(|pattern| pattern.is_match(&path_str)) {
                tracing::debug!(target: TRACING_TARGET, path = %path_str, "path excluded by selector");
                continue;
            }

            if is_dir {
                // `depth` counts directory levels: 1 keeps the walk at the
                // selector root, 2 includes its subdirectories, and so on.
                let descend = match depth_left {
                    Some(depth) => depth > 1,
                    None => true,
                };
                if !descend {
                    continue;
                }
                let children = Box::pin(self.walk_directory(
                    &path,
                    depth_left.map(|depth| depth - 1),
                    excludes,
                    want_frontmatter,
                ))
                .await?;
                if !children.is_empty() {
                    nodes.push(Node::container(name, children));
                }
            } else if name.ends_with(".md") {
                let mut node = Node::document(name, path_str.clone());
                if want_frontmatter
                    && let Some(frontmatter) = self.read_frontmatter(&path_str).await
                {
                    node.properties.insert(
                        serde_yaml::Value::from(PROPERTY_FRONTMATTER),
                        frontmatter,
                    );
                }
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Best-effort frontmatter extraction for selector filtering.
    async fn read_frontmatter(&self, path: &str) -> Option<serde_yaml::Value> {
        let data = tokio::fs::read(path).await.ok()?;
        let text = String::from_utf8(data).ok()?;
        let (frontmatter, _) = docloom_core::frontmatter::split(&text);
        serde_yaml::from_str(frontmatter?).ok()
    }
}

#[async_trait]
impl ResourceHandler for FsHandler {
    fn accept(&self, uri: &str) -> bool {
        uri.starts_with("file://") || !uri.contains(':')
    }

    fn build_abs_link(&self, source: &str, relative: &str) -> HandlerResult<String> {
        if relative.starts_with('/') {
            return Ok(relative.to_string());
        }
        let source = fs_path(source);
        let parent = match source.rfind('/') {
            Some(at) => &source[..at],
            None => "",
        };
        Ok(urls::normalize_path(&format!("{parent}/{relative}")))
    }

    async fn resolve_node_selector(&self, selector: &NodeSelector) -> HandlerResult<Vec<Node>> {
        let mut excludes = Vec::with_capacity(selector.exclude_paths.len());
        for pattern in &selector.exclude_paths {
            excludes.push(
                Regex::new(pattern).map_err(|err| HandlerError::InvalidReference {
                    reference: pattern.clone(),
                    reason: err.to_string(),
                })?,
            );
        }

        let root = PathBuf::from(fs_path(&selector.path));
        self.walk_directory(
            &root,
            selector.depth,
            &excludes,
            selector.frontmatter.is_some(),
        )
        .await
    }

    async fn resolve_documentation(&self, uri: &str) -> HandlerResult<Option<Manifest>> {
        let path = fs_path(uri);
        if !path.ends_with(".yaml") && !path.ends_with(".yml") {
            return Ok(None);
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| io_error(path, err))?;
        let manifest =
            Manifest::from_yaml(&data).map_err(|err| HandlerError::InvalidReference {
                reference: uri.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Some(manifest))
    }

    async fn read(&self, uri: &str) -> HandlerResult<Bytes> {
        let path = fs_path(uri);
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| io_error(path, err))?;
        Ok(Bytes::from(data))
    }

    async fn read_git_info(&self, uri: &str) -> HandlerResult<Bytes> {
        let path = fs_path(uri);
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| io_error(path, err))?;

        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs());

        let record = serde_json::json!({
            "path": path,
            "sizeBytes": metadata.len(),
            "modifiedUnixSecs": modified,
        });
        Ok(Bytes::from(serde_json::to_vec(&record).expect("static record serializes")))
    }

    fn resource_name(&self, uri: &str) -> (String, String) {
        urls::stem_and_extension(fs_path(uri))
    }
}

/// Strips the optional `file://` scheme off a URI.
fn fs_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

fn io_error(path: &str, err: std::io::Error) -> HandlerError {
    match err.kind() {
        std::io::ErrorKind::NotFound => HandlerError::NotFound(path.to_string()),
        std::io::ErrorKind::PermissionDenied => HandlerError::Forbidden(path.to_string()),
        _ => HandlerError::access(path, err),
    }
}
