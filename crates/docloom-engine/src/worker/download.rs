//! Embedded-resource download worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docloom_core::io::{Reader, Writer};
use docloom_core::task::DownloadTask;
use docloom_core::BoxedError;
use tokio_util::sync::CancellationToken;

use crate::queue::JobHandler;

/// Tracing target for download operations.
const TRACING_TARGET: &str = "docloom_engine::worker::download";

/// Downloads embedded resources, at most once per logical source.
///
/// Every task for an already-claimed source is appended to that source's
/// record and succeeds without I/O, so any number of links to one resource
/// cost exactly one read.
pub struct DownloadWorker {
    reader: Arc<dyn Reader>,
    writer: Arc<dyn Writer>,
    resources_root: String,
    downloaded: Mutex<HashMap<String, Vec<DownloadTask>>>,
}

impl DownloadWorker {
    pub fn new(
        reader: Arc<dyn Reader>,
        writer: Arc<dyn Writer>,
        resources_root: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            writer,
            resources_root: resources_root.into().trim_start_matches('/').to_string(),
            downloaded: Mutex::new(HashMap::new()),
        }
    }

    /// Claims a source for download.
    ///
    /// Returns `false` when the source was already claimed; the task is
    /// then folded into the existing record.
    fn claim(&self, task: &DownloadTask) -> bool {
        let mut downloaded = self.downloaded.lock().expect("download lock poisoned");
        match downloaded.get_mut(&task.source) {
            Some(tasks) => {
                tasks.push(task.clone());
                false
            }
            None => {
                downloaded.insert(task.source.clone(), vec![task.clone()]);
                true
            }
        }
    }

    /// Number of distinct sources claimed so far.
    pub fn claimed_sources(&self) -> usize {
        self.downloaded.lock().expect("download lock poisoned").len()
    }

    /// Recorded tasks for a source, in arrival order.
    pub fn recorded(&self, source: &str) -> Vec<DownloadTask> {
        self.downloaded
            .lock()
            .expect("download lock poisoned")
            .get(source)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobHandler<DownloadTask> for DownloadWorker {
    async fn handle(
        &self,
        _token: &CancellationToken,
        task: DownloadTask,
    ) -> Result<(), BoxedError> {
        if !self.claim(&task) {
            tracing::trace!(
                target: TRACING_TARGET,
                source = %task.source,
                "source already scheduled, folding duplicate"
            );
            return Ok(());
        }

        let data = match self.reader.read(&task.source).await {
            Ok(data) => data,
            Err(error) if error.is_not_found() => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    source = %task.source,
                    referer = %task.referer,
                    "embedded resource missing, skipping download"
                );
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        tracing::debug!(
            target: TRACING_TARGET,
            source = %task.source,
            target_name = %task.target,
            bytes = data.len(),
            "resource downloaded"
        );

        self.writer
            .write(&task.target, &self.resources_root, data)
            .await?;
        Ok(())
    }
}
