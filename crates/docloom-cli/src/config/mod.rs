//! CLI configuration management.
//!
//! The complete configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── manifest: PathBuf            # positional manifest path
//! ├── build: BuildConfig           # output root, resources, fail-fast
//! ├── concurrency: ConcurrencyConfig # worker counts per queue
//! └── hugo: HugoOptions            # Hugo output conventions
//! ```
//!
//! All options can be provided via CLI arguments or environment
//! variables; use `--help` to see the full surface.

mod build;
mod concurrency;
mod hugo;

use std::path::PathBuf;

pub use build::BuildConfig;
use clap::Parser;
pub use concurrency::ConcurrencyConfig;
use docloom_engine::{BuildOptions, WorkerCounts};
pub use hugo::HugoOptions;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::TRACING_TARGET_CONFIG;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "docloom")]
#[command(about = "Builds a documentation corpus from a manifest")]
#[command(version)]
pub struct Cli {
    /// Path to the manifest describing the documentation tree.
    pub manifest: PathBuf,

    /// Output and build-policy configuration.
    #[clap(flatten)]
    pub build: BuildConfig,

    /// Worker counts per queue.
    #[clap(flatten)]
    pub concurrency: ConcurrencyConfig,

    /// Hugo output conventions.
    #[clap(flatten)]
    pub hugo: HugoOptions,
}

impl Cli {
    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.concurrency.validate()?;
        Ok(())
    }

    /// Logs the effective configuration (no sensitive information).
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            manifest = %self.manifest.display(),
            output = %self.build.output.display(),
            resources_root = %self.build.resources_root,
            fail_fast = self.build.fail_fast,
            git_info = self.build.git_info,
            hugo = self.hugo.hugo,
            "build configuration"
        );
        self.concurrency.log();
    }

    /// Assembles the engine's build options.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            workers: WorkerCounts {
                document: self.concurrency.document_workers,
                download: self.concurrency.download_workers,
                validation: self.concurrency.validation_workers,
                git_info: self.concurrency.git_info_workers,
            },
            fail_fast: self.build.fail_fast,
            resources_root: self.build.resources_root.clone(),
            collect_git_info: self.build.git_info,
            hugo: self.hugo.to_config(),
        }
    }
}
