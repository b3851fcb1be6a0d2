//! Provenance collection worker.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use docloom_core::BoxedError;
use docloom_core::handler::HandlerRegistry;
use docloom_core::io::Writer;
use docloom_core::task::GitInfoTask;
use tokio_util::sync::CancellationToken;

use crate::queue::JobHandler;

/// Tracing target for provenance collection.
const TRACING_TARGET: &str = "docloom_engine::worker::git_info";

/// Collects provenance records for a document's sources and writes them
/// to a sibling `<stem>.json` record through the dedicated writer.
pub struct GitInfoWorker {
    registry: HandlerRegistry,
    writer: Arc<dyn Writer>,
}

impl GitInfoWorker {
    pub fn new(registry: HandlerRegistry, writer: Arc<dyn Writer>) -> Self {
        Self { registry, writer }
    }
}

#[async_trait]
impl JobHandler<GitInfoTask> for GitInfoWorker {
    async fn handle(
        &self,
        _token: &CancellationToken,
        task: GitInfoTask,
    ) -> Result<(), BoxedError> {
        let document = &task.document;
        let mut records: Vec<serde_json::Value> = Vec::new();

        for source in &document.sources {
            let Some(handler) = self.registry.get(source) else {
                tracing::warn!(
                    target: TRACING_TARGET,
                    source = %source,
                    "no handler for source, skipping provenance"
                );
                continue;
            };

            let blob = match handler.read_git_info(source).await {
                Ok(blob) => blob,
                Err(error) if error.is_not_found() => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        source = %source,
                        document = %document.position(),
                        "no provenance available for source"
                    );
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            if blob.is_empty() {
                continue;
            }
            records.push(serde_json::from_slice(&blob)?);
        }

        if records.is_empty() {
            return Ok(());
        }

        let payload = if records.len() == 1 {
            records.remove(0)
        } else {
            serde_json::Value::Array(records)
        };

        let name = record_name(&document.name);
        let data = Bytes::from(serde_json::to_vec_pretty(&payload)?);
        self.writer.write(&name, &document.path, data).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            document = %document.position(),
            record = %name,
            "provenance recorded"
        );
        Ok(())
    }
}

/// Sibling record name: the document's stem with a `.json` extension.
fn record_name(document_name: &str) -> String {
    let stem = document_name.strip_suffix(".md").unwrap_or(document_name);
    format!("{stem}.json")
}
