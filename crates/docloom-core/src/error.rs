//! Common error type definitions.

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Used as the uniform error currency at the job-queue boundary, where tasks
/// of different kinds surface failures of different concrete types.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for core operations.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Errors produced by the core model layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The manifest document could not be deserialized.
    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_yaml::Error),
}
