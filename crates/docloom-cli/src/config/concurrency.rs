//! Worker-count configuration.

use anyhow::anyhow;
use clap::Args;

use crate::TRACING_TARGET_CONFIG;

/// Worker counts of the four build queues.
///
/// Every count must lie in 1..=100; the queue primitive rejects anything
/// else at construction, so the CLI validates early for a friendlier
/// message.
#[derive(Debug, Clone, Args)]
pub struct ConcurrencyConfig {
    /// Number of parallel document render workers.
    #[arg(long, env = "DOCLOOM_DOCUMENT_WORKERS", default_value_t = 10)]
    pub document_workers: usize,

    /// Number of parallel resource download workers.
    #[arg(long, env = "DOCLOOM_DOWNLOAD_WORKERS", default_value_t = 10)]
    pub download_workers: usize,

    /// Number of parallel link validation workers.
    #[arg(long, env = "DOCLOOM_VALIDATION_WORKERS", default_value_t = 10)]
    pub validation_workers: usize,

    /// Number of parallel provenance workers.
    #[arg(long, env = "DOCLOOM_GIT_INFO_WORKERS", default_value_t = 5)]
    pub git_info_workers: usize,
}

impl ConcurrencyConfig {
    /// Validates every worker count.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (queue, count) in [
            ("document", self.document_workers),
            ("download", self.download_workers),
            ("validation", self.validation_workers),
            ("git-info", self.git_info_workers),
        ] {
            if count == 0 || count > 100 {
                return Err(anyhow!(
                    "{queue} worker count {count} is invalid; must be between 1 and 100"
                ));
            }
        }
        Ok(())
    }

    /// Logs the effective worker counts.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            document_workers = self.document_workers,
            download_workers = self.download_workers,
            validation_workers = self.validation_workers,
            git_info_workers = self.git_info_workers,
            "concurrency configuration"
        );
    }
}
