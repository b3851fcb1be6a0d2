//! Typed façades over the job queues.
//!
//! Producers never see the queue type directly; each façade builds the
//! task value and offers it. A refusal is logged but is not a
//! build-failing condition — queues may legitimately be stopping while
//! producers still race.

use docloom_core::task::{DocumentRef, DownloadTask, GitInfoTask, ValidationTask};

use crate::queue::JobQueue;

/// Tracing target for scheduling decisions.
const TRACING_TARGET: &str = "docloom_engine::scheduler";

/// Schedules embedded-resource downloads.
#[derive(Clone)]
pub struct DownloadScheduler {
    queue: JobQueue<DownloadTask>,
}

impl DownloadScheduler {
    pub fn new(queue: JobQueue<DownloadTask>) -> Self {
        Self { queue }
    }

    /// Offers a download task; returns whether it was accepted.
    pub async fn schedule(&self, task: DownloadTask) -> bool {
        let source = task.source.clone();
        let accepted = self.queue.add_task(task).await;
        if !accepted {
            tracing::warn!(
                target: TRACING_TARGET,
                source = %source,
                "download refused, queue is stopping"
            );
        }
        accepted
    }
}

/// Schedules external-link reachability checks.
#[derive(Clone)]
pub struct Validator {
    queue: JobQueue<ValidationTask>,
}

impl Validator {
    pub fn new(queue: JobQueue<ValidationTask>) -> Self {
        Self { queue }
    }

    /// Offers a validation task; returns whether it was accepted.
    pub async fn validate_link(&self, url: &str, destination: &str, source_path: &str) -> bool {
        let accepted = self
            .queue
            .add_task(ValidationTask {
                url: url.to_string(),
                destination: destination.to_string(),
                source_path: source_path.to_string(),
            })
            .await;
        if !accepted {
            tracing::warn!(
                target: TRACING_TARGET,
                url,
                source = source_path,
                "validation refused, queue is stopping"
            );
        }
        accepted
    }
}

/// Schedules provenance collection for documents.
#[derive(Clone)]
pub struct GitInfo {
    queue: JobQueue<GitInfoTask>,
}

impl GitInfo {
    pub fn new(queue: JobQueue<GitInfoTask>) -> Self {
        Self { queue }
    }

    /// Offers a provenance task; returns whether it was accepted.
    pub async fn record(&self, document: DocumentRef) -> bool {
        let position = document.position();
        let accepted = self.queue.add_task(GitInfoTask { document }).await;
        if !accepted {
            tracing::warn!(
                target: TRACING_TARGET,
                document = %position,
                "provenance collection refused, queue is stopping"
            );
        }
        accepted
    }
}
