#![forbid(unsafe_code)]

mod config;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use docloom_core::handler::HandlerRegistry;
use docloom_core::io::RegistryReader;
use docloom_core::manifest::Manifest;
use docloom_engine::BuildOrchestrator;
use docloom_fs::{FsHandler, FsWriter};
use tokio_util::sync::CancellationToken;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "docloom_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "docloom_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "docloom_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "build terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "build terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    Cli::init_tracing();
    log_startup_info();

    cli.validate().context("invalid configuration")?;
    cli.log();

    let location = cli.manifest.to_string_lossy().into_owned();
    let data = tokio::fs::read(&cli.manifest)
        .await
        .with_context(|| format!("failed to read manifest '{location}'"))?;
    let manifest = Manifest::from_yaml(&data)
        .with_context(|| format!("failed to parse manifest '{location}'"))?;

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(FsHandler::new()));

    let reader = Arc::new(RegistryReader::new(registry.clone()));
    let writer = Arc::new(FsWriter::new(&cli.build.output));
    let git_info_writer = Arc::new(FsWriter::new(cli.build.git_info_dir()));

    let orchestrator = BuildOrchestrator::new(registry, reader, writer, cli.build_options())
        .with_git_info_writer(git_info_writer);

    let token = CancellationToken::new();
    spawn_interrupt_watcher(token.clone());

    let summary = orchestrator.run(manifest, &location, token).await?;

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        documents = summary.documents,
        downloads = summary.downloads,
        validations = summary.validations,
        git_info = summary.git_info,
        "corpus built"
    );
    Ok(())
}

/// Cancels the build token on CTRL-C so queues drain gracefully.
fn spawn_interrupt_watcher(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(
                target: TRACING_TARGET_SHUTDOWN,
                "interrupt received, cancelling build"
            );
            token.cancel();
        }
    });
}

/// Logs startup information.
fn log_startup_info() {
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting docloom"
    );

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        "build information"
    );
}
