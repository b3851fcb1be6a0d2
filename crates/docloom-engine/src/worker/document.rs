//! Document render worker.

use std::sync::Arc;

use async_trait::async_trait;
use docloom_core::BoxedError;
use docloom_core::io::Writer;
use docloom_core::task::DocumentTask;
use tokio_util::sync::CancellationToken;

use crate::document::NodeContentProcessor;
use crate::queue::JobHandler;

/// Tracing target for document rendering.
const TRACING_TARGET: &str = "docloom_engine::worker::document";

/// Renders one document per task and writes it to the output sink.
pub struct DocumentWorker {
    processor: NodeContentProcessor,
    writer: Arc<dyn Writer>,
}

impl DocumentWorker {
    pub fn new(processor: NodeContentProcessor, writer: Arc<dyn Writer>) -> Self {
        Self { processor, writer }
    }
}

#[async_trait]
impl JobHandler<DocumentTask> for DocumentWorker {
    async fn handle(
        &self,
        _token: &CancellationToken,
        task: DocumentTask,
    ) -> Result<(), BoxedError> {
        let document = &task.document;
        let content = self.processor.process(document).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            document = %document.position(),
            bytes = content.len(),
            "document rendered"
        );

        self.writer
            .write(&document.name, &document.path, content)
            .await?;
        Ok(())
    }
}
