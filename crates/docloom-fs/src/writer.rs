//! Filesystem output writer.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use docloom_core::io::{Writer, WriterError};

/// Tracing target for output writes.
const TRACING_TARGET: &str = "docloom_fs::writer";

/// Writes build outputs under an output root, creating directories as
/// needed.
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root directory.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl Writer for FsWriter {
    async fn write(&self, name: &str, path: &str, data: Bytes) -> Result<(), WriterError> {
        let mut dir = self.root.clone();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            dir.push(segment);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| WriterError::write(dir.to_string_lossy(), err))?;

        let file = dir.join(name);
        tokio::fs::write(&file, &data)
            .await
            .map_err(|err| WriterError::write(file.to_string_lossy(), err))?;

        tracing::trace!(
            target: TRACING_TARGET,
            file = %file.display(),
            bytes = data.len(),
            "output written"
        );
        Ok(())
    }
}
