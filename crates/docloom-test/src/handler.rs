//! In-memory resource handler.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use docloom_core::handler::{HandlerError, HandlerResult, ResourceHandler};
use docloom_core::manifest::Manifest;
use docloom_core::node::{Node, NodeSelector};
use docloom_core::urls;
use url::Url;

/// A scripted [`ResourceHandler`] serving content from memory.
///
/// Accepts every URI starting with its prefix. Reads are counted per URI
/// so tests can assert download deduplication. Contents, provenance
/// blobs, sub-manifests and selector expansions are all scripted through
/// the `with_*` builder methods.
pub struct MemoryHandler {
    prefix: String,
    files: Mutex<HashMap<String, Bytes>>,
    read_counts: Mutex<HashMap<String, usize>>,
    git_info: Mutex<HashMap<String, Bytes>>,
    manifests: Mutex<HashMap<String, Manifest>>,
    selectors: Mutex<HashMap<String, Vec<Node>>>,
    fail_reads: Mutex<std::collections::HashSet<String>>,
}

impl MemoryHandler {
    /// Creates a handler claiming every URI under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            files: Mutex::new(HashMap::new()),
            read_counts: Mutex::new(HashMap::new()),
            git_info: Mutex::new(HashMap::new()),
            manifests: Mutex::new(HashMap::new()),
            selectors: Mutex::new(HashMap::new()),
            fail_reads: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Scripts the content served for a URI.
    pub fn with_file(self, uri: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.files.lock().unwrap().insert(uri.into(), content.into());
        self
    }

    /// Scripts the provenance blob served for a URI.
    pub fn with_git_info(self, uri: impl Into<String>, blob: impl Into<Bytes>) -> Self {
        self.git_info.lock().unwrap().insert(uri.into(), blob.into());
        self
    }

    /// Scripts a sub-manifest resolved for a URI.
    pub fn with_manifest(self, uri: impl Into<String>, manifest: Manifest) -> Self {
        self.manifests.lock().unwrap().insert(uri.into(), manifest);
        self
    }

    /// Scripts the nodes a selector path expands to.
    pub fn with_selector(self, path: impl Into<String>, nodes: Vec<Node>) -> Self {
        self.selectors.lock().unwrap().insert(path.into(), nodes);
        self
    }

    /// Makes reads of a URI fail with an access-denied error.
    pub fn with_read_failure(self, uri: impl Into<String>) -> Self {
        self.fail_reads.lock().unwrap().insert(uri.into());
        self
    }

    /// Number of reads performed for a URI.
    pub fn read_count(&self, uri: &str) -> usize {
        self.read_counts.lock().unwrap().get(uri).copied().unwrap_or(0)
    }

    /// Total number of reads across all URIs.
    pub fn total_reads(&self) -> usize {
        self.read_counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ResourceHandler for MemoryHandler {
    fn accept(&self, uri: &str) -> bool {
        uri.starts_with(&self.prefix)
    }

    fn build_abs_link(&self, source: &str, relative: &str) -> HandlerResult<String> {
        let base = Url::parse(source).map_err(|err| HandlerError::InvalidReference {
            reference: source.to_string(),
            reason: err.to_string(),
        })?;
        let joined = base.join(relative).map_err(|err| HandlerError::InvalidReference {
            reference: relative.to_string(),
            reason: err.to_string(),
        })?;
        Ok(joined.to_string())
    }

    async fn resolve_node_selector(&self, selector: &NodeSelector) -> HandlerResult<Vec<Node>> {
        match self.selectors.lock().unwrap().get(&selector.path) {
            Some(nodes) => Ok(nodes.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn resolve_documentation(&self, uri: &str) -> HandlerResult<Option<Manifest>> {
        Ok(self.manifests.lock().unwrap().get(uri).cloned())
    }

    async fn read(&self, uri: &str) -> HandlerResult<Bytes> {
        *self
            .read_counts
            .lock()
            .unwrap()
            .entry(uri.to_string())
            .or_insert(0) += 1;
        if self.fail_reads.lock().unwrap().contains(uri) {
            return Err(HandlerError::Forbidden(uri.to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| HandlerError::NotFound(uri.to_string()))
    }

    async fn read_git_info(&self, uri: &str) -> HandlerResult<Bytes> {
        self.git_info
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| HandlerError::NotFound(uri.to_string()))
    }

    fn resource_name(&self, uri: &str) -> (String, String) {
        urls::stem_and_extension(uri)
    }

    fn raw_format_link(&self, uri: &str) -> Option<String> {
        uri.contains("/blob/").then(|| uri.replacen("/blob/", "/raw/", 1))
    }
}
