//! Reader and writer contracts.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BoxedError;
use crate::handler::{HandlerError, HandlerRegistry, HandlerResult};

/// Reads content blobs by URI.
#[async_trait]
pub trait Reader: Send + Sync {
    async fn read(&self, uri: &str) -> HandlerResult<Bytes>;
}

/// Thin dispatcher selecting a handler from the registry by URI.
#[derive(Debug, Clone)]
pub struct RegistryReader {
    registry: HandlerRegistry,
}

impl RegistryReader {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Reader for RegistryReader {
    async fn read(&self, uri: &str) -> HandlerResult<Bytes> {
        let handler = self.registry.get(uri).ok_or_else(|| {
            HandlerError::InvalidReference {
                reference: uri.to_string(),
                reason: "no registered handler accepts the URI".to_string(),
            }
        })?;
        handler.read(uri).await
    }
}

/// Errors surfaced by writers.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: BoxedError,
    },
}

impl WriterError {
    /// Creates a write error for a path with a source error.
    pub fn write(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Write {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Writes build outputs.
///
/// `path` is `/`-separated and relative to the writer's root; the side
/// effect is "file created or overwritten at `path/name`".
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, name: &str, path: &str, data: Bytes) -> Result<(), WriterError>;
}
