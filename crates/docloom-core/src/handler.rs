//! The resource-handler contract and registry.
//!
//! A resource handler is a protocol-specific collaborator that knows how to
//! fetch, name and link-rewrite for a family of URIs. The engine never
//! talks to a remote location directly; every read, selector expansion and
//! provenance lookup goes through the handler selected from the registry.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BoxedError;
use crate::manifest::Manifest;
use crate::node::{Node, NodeSelector};

/// Result type alias for handler operations.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Errors surfaced by resource handlers.
///
/// The engine downgrades [`HandlerError::NotFound`] to a warning wherever a
/// missing resource should not fail the build; every other variant is a
/// real failure and follows the fail-fast policy of the consuming queue.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The resource does not exist at its source.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The source refused access to the resource.
    #[error("access denied to resource: {0}")]
    Forbidden(String),

    /// The URI cannot be understood by the handler.
    #[error("invalid resource reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Reading or listing the resource failed.
    #[error("failed to access '{uri}': {source}")]
    Access {
        uri: String,
        #[source]
        source: BoxedError,
    },
}

impl HandlerError {
    /// Creates an access error with a uri and a source error.
    pub fn access(
        uri: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Access {
            uri: uri.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error is a missing-resource condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Protocol-specific plugin for a family of URIs.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Whether this handler is responsible for the given URI.
    fn accept(&self, uri: &str) -> bool;

    /// Builds the absolute form of `relative` as referenced from `source`.
    fn build_abs_link(&self, source: &str, relative: &str) -> HandlerResult<String>;

    /// Expands a node selector pointing into this handler's territory.
    ///
    /// The selector path is absolute by the time it reaches the handler.
    /// Handlers honor `depth` and `exclude_paths`, and populate the
    /// `frontmatter` property of returned markdown nodes when the selector
    /// carries frontmatter filters (filtering itself happens in the
    /// resolver).
    async fn resolve_node_selector(&self, selector: &NodeSelector) -> HandlerResult<Vec<Node>>;

    /// Returns the manifest a URI names, or `None` when the URI is not a
    /// manifest document.
    async fn resolve_documentation(&self, uri: &str) -> HandlerResult<Option<Manifest>>;

    /// Reads the content blob behind a URI.
    async fn read(&self, uri: &str) -> HandlerResult<Bytes>;

    /// Reads a provenance record (JSON) for a URI.
    async fn read_git_info(&self, uri: &str) -> HandlerResult<Bytes>;

    /// Splits a URI into a resource name stem and extension (with dot).
    fn resource_name(&self, uri: &str) -> (String, String);

    /// Returns the raw-content form of a URI, for handlers that serve
    /// rendered and raw content at different locations.
    fn raw_format_link(&self, uri: &str) -> Option<String> {
        let _ = uri;
        None
    }

    /// The HTTP client backing this handler, when it has one.
    fn client(&self) -> Option<&reqwest::Client> {
        None
    }
}

/// Ordered collection of handlers; the first accepting handler wins.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler; earlier registrations take precedence.
    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the first handler accepting the URI.
    pub fn get(&self, uri: &str) -> Option<&Arc<dyn ResourceHandler>> {
        self.handlers.iter().find(|h| h.accept(uri))
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PrefixHandler(&'static str);

    #[async_trait]
    impl ResourceHandler for PrefixHandler {
        fn accept(&self, uri: &str) -> bool {
            uri.starts_with(self.0)
        }

        fn build_abs_link(&self, _source: &str, relative: &str) -> HandlerResult<String> {
            Ok(relative.to_string())
        }

        async fn resolve_node_selector(
            &self,
            _selector: &NodeSelector,
        ) -> HandlerResult<Vec<Node>> {
            Ok(Vec::new())
        }

        async fn resolve_documentation(&self, _uri: &str) -> HandlerResult<Option<Manifest>> {
            Ok(None)
        }

        async fn read(&self, uri: &str) -> HandlerResult<Bytes> {
            Err(HandlerError::NotFound(uri.to_string()))
        }

        async fn read_git_info(&self, uri: &str) -> HandlerResult<Bytes> {
            Err(HandlerError::NotFound(uri.to_string()))
        }

        fn resource_name(&self, _uri: &str) -> (String, String) {
            (String::new(), String::new())
        }
    }

    #[test]
    fn first_accepting_handler_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(PrefixHandler("https://a.example/")));
        registry.register(Arc::new(PrefixHandler("https://")));

        let handler = registry.get("https://a.example/x").unwrap();
        assert!(handler.accept("https://a.example/y"));

        // The generic handler only catches what the specific one refused.
        assert!(registry.get("https://b.example/x").is_some());
        assert!(registry.get("ftp://b.example/x").is_none());
    }

    #[test]
    fn not_found_classification() {
        assert!(HandlerError::NotFound("x".into()).is_not_found());
        assert!(!HandlerError::Forbidden("x".into()).is_not_found());
    }
}
