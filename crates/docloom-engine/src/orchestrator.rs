//! Build orchestration.
//!
//! Wires the four queues together, enumerates the resolved tree into the
//! document queue, waits on the shared completion barrier and reports the
//! composite outcome. Start order is downloads, validations, git-info,
//! documents; queues stop in reverse once the barrier clears.

use std::sync::Arc;

use docloom_core::BoxedError;
use docloom_core::handler::HandlerRegistry;
use docloom_core::io::{Reader, Writer};
use docloom_core::manifest::Manifest;
use docloom_core::task::DocumentTask;
use tokio_util::sync::CancellationToken;

use crate::document::NodeContentProcessor;
use crate::hugo::HugoConfig;
use crate::link::{CompiledLinkRules, LinkError, LinkResolver, SourceIndex};
use crate::queue::{JobQueue, QueueError, WaitGroup};
use crate::resolve::{ManifestResolver, ResolveError};
use crate::scheduler::{DownloadScheduler, GitInfo, Validator};
use crate::worker::{DocumentWorker, DownloadWorker, GitInfoWorker, ValidationWorker};

/// Tracing target for build orchestration.
const TRACING_TARGET: &str = "docloom_engine::orchestrator";

/// Worker counts per queue.
#[derive(Debug, Clone)]
pub struct WorkerCounts {
    pub document: usize,
    pub download: usize,
    pub validation: usize,
    pub git_info: usize,
}

impl Default for WorkerCounts {
    fn default() -> Self {
        Self {
            document: 10,
            download: 10,
            validation: 10,
            git_info: 5,
        }
    }
}

/// Build configuration consumed by the orchestrator.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub workers: WorkerCounts,
    /// Stop the build on the first document error.
    pub fail_fast: bool,
    /// Directory name (or site-absolute path) downloaded resources land in.
    pub resources_root: String,
    /// Collect per-document provenance records.
    pub collect_git_info: bool,
    /// Hugo output conventions; `None` renders plain relative links.
    pub hugo: Option<HugoConfig>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            workers: WorkerCounts::default(),
            fail_fast: false,
            resources_root: "__resources".to_string(),
            collect_git_info: false,
            hugo: None,
        }
    }
}

/// Counts reported after a successful build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildSummary {
    pub documents: usize,
    pub downloads: usize,
    pub validations: usize,
    pub git_info: usize,
}

/// Per-queue error lists aggregated into the final build error.
#[derive(Debug, Default)]
pub struct TaskErrors {
    queues: Vec<(String, Vec<Arc<BoxedError>>)>,
}

impl TaskErrors {
    fn push(&mut self, queue: &str, errors: Vec<Arc<BoxedError>>) {
        if !errors.is_empty() {
            self.queues.push((queue.to_string(), errors));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Total number of collected task errors.
    pub fn total(&self) -> usize {
        self.queues.iter().map(|(_, errors)| errors.len()).sum()
    }

    /// Errors collected for one queue.
    pub fn for_queue(&self, queue: &str) -> &[Arc<BoxedError>] {
        self.queues
            .iter()
            .find(|(name, _)| name == queue)
            .map(|(_, errors)| errors.as_slice())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for TaskErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "build finished with {} error(s)", self.total())?;
        for (queue, errors) in &self.queues {
            for error in errors {
                write!(f, "\n  [{queue}] {error}")?;
            }
        }
        Ok(())
    }
}

/// Errors failing a build as a whole.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("failed to build validation client: {0}")]
    Client(#[from] reqwest::Error),

    /// One or more tasks failed; per-queue lists inside.
    #[error("{0}")]
    Tasks(TaskErrors),
}

/// Runs complete builds over a handler registry and output sinks.
pub struct BuildOrchestrator {
    registry: HandlerRegistry,
    reader: Arc<dyn Reader>,
    writer: Arc<dyn Writer>,
    git_info_writer: Option<Arc<dyn Writer>>,
    validation_client: Option<reqwest::Client>,
    options: BuildOptions,
}

impl BuildOrchestrator {
    pub fn new(
        registry: HandlerRegistry,
        reader: Arc<dyn Reader>,
        writer: Arc<dyn Writer>,
        options: BuildOptions,
    ) -> Self {
        Self {
            registry,
            reader,
            writer,
            git_info_writer: None,
            validation_client: None,
            options,
        }
    }

    /// Routes provenance records to a dedicated writer (defaults to the
    /// main output writer).
    pub fn with_git_info_writer(mut self, writer: Arc<dyn Writer>) -> Self {
        self.git_info_writer = Some(writer);
        self
    }

    /// Overrides the HTTP client used for link validation.
    pub fn with_validation_client(mut self, client: reqwest::Client) -> Self {
        self.validation_client = Some(client);
        self
    }

    /// Builds the corpus described by `manifest` (loaded from `location`).
    pub async fn run(
        &self,
        manifest: Manifest,
        location: &str,
        token: CancellationToken,
    ) -> Result<BuildSummary, BuildError> {
        let options = &self.options;

        let resolver = ManifestResolver::new(self.registry.clone(), options.hugo.clone());
        let resolved = resolver.resolve(manifest, location).await?;
        let index = SourceIndex::build(&resolved.structure);
        let rules = CompiledLinkRules::compile(resolved.links.as_ref())?;

        let wait_group = WaitGroup::new();
        let build_token = token.child_token();

        let download_worker = Arc::new(DownloadWorker::new(
            Arc::clone(&self.reader),
            Arc::clone(&self.writer),
            &options.resources_root,
        ));
        let download_queue = JobQueue::new(
            "downloads",
            options.workers.download,
            download_worker,
            false,
            wait_group.clone(),
        )?;
        let downloads = DownloadScheduler::new(download_queue.clone());

        let validation_worker = Arc::new(match &self.validation_client {
            Some(client) => ValidationWorker::new(client.clone()),
            None => ValidationWorker::with_defaults()?,
        });
        let validation_queue = JobQueue::new(
            "validations",
            options.workers.validation,
            validation_worker,
            false,
            wait_group.clone(),
        )?;
        let validator = Validator::new(validation_queue.clone());

        let git_info = if options.collect_git_info {
            let writer = self
                .git_info_writer
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.writer));
            let worker = Arc::new(GitInfoWorker::new(self.registry.clone(), writer));
            let queue = JobQueue::new(
                "git-info",
                options.workers.git_info,
                worker,
                false,
                wait_group.clone(),
            )?;
            Some((GitInfo::new(queue.clone()), queue))
        } else {
            None
        };

        let link_resolver = Arc::new(LinkResolver::new(
            self.registry.clone(),
            index,
            rules,
            downloads,
            validator,
            options.hugo.clone(),
            &options.resources_root,
        ));
        let processor = NodeContentProcessor::new(
            Arc::clone(&self.reader),
            link_resolver,
            options.hugo.is_some(),
        );
        let document_worker = Arc::new(DocumentWorker::new(processor, Arc::clone(&self.writer)));
        let document_queue = JobQueue::new(
            "documents",
            options.workers.document,
            document_worker,
            options.fail_fast,
            wait_group.clone(),
        )?;

        download_queue.start(build_token.clone());
        validation_queue.start(build_token.clone());
        if let Some((_, queue)) = &git_info {
            queue.start(build_token.clone());
        }
        document_queue.start(build_token.clone());

        let documents = resolved.documents(options.hugo.is_some());
        tracing::info!(
            target: TRACING_TARGET,
            location,
            documents = documents.len(),
            fail_fast = options.fail_fast,
            "build started"
        );

        for document in documents {
            if let Some((scheduler, _)) = &git_info {
                scheduler.record(document.clone()).await;
            }
            if !document_queue.add_task(DocumentTask { document }).await {
                tracing::warn!(
                    target: TRACING_TARGET,
                    "document refused, queue is stopping"
                );
            }
        }

        // No more producers for the document queue; everything else drains
        // through the shared barrier.
        document_queue.stop().await;
        wait_group.wait().await;

        if let Some((_, queue)) = &git_info {
            queue.stop().await;
        }
        validation_queue.stop().await;
        download_queue.stop().await;

        let mut errors = TaskErrors::default();
        errors.push("documents", document_queue.error_list());
        errors.push("downloads", download_queue.error_list());
        errors.push("validations", validation_queue.error_list());
        if let Some((_, queue)) = &git_info {
            errors.push("git-info", queue.error_list());
        }
        if !errors.is_empty() {
            return Err(BuildError::Tasks(errors));
        }

        let summary = BuildSummary {
            documents: document_queue.processed_count(),
            downloads: download_queue.processed_count(),
            validations: validation_queue.processed_count(),
            git_info: git_info
                .as_ref()
                .map(|(_, queue)| queue.processed_count())
                .unwrap_or_default(),
        };
        tracing::info!(
            target: TRACING_TARGET,
            documents = summary.documents,
            downloads = summary.downloads,
            validations = summary.validations,
            "build finished"
        );
        Ok(summary)
    }
}
