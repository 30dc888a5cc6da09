//! Task queue collaborator: at-least-once delivery of import work.
//!
//! The core never retries on its own; retry and backoff belong to the
//! queue. `LocalQueue` is the in-process implementation used by the CLI
//! worker, with bounded retry per delivery. Deployments with an external
//! queue only need to implement [`TaskQueue`] and feed a consumer into
//! [`crate::assets::Importer::handle`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::assets::Importer;
use crate::error::{Error, Result};

/// Payload for an asynchronous content import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTask {
    pub parent_guid: String,
    pub source_uri: String,
}

/// At-least-once task submission.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: ImportTask) -> Result<()>;
}

/// A queue that drops every task. Used by read-only tooling where imports
/// can never be serviced anyway.
pub struct NoopQueue;

#[async_trait]
impl TaskQueue for NoopQueue {
    async fn enqueue(&self, task: ImportTask) -> Result<()> {
        warn!(uri = %task.source_uri, "no import worker attached, dropping import task");
        Ok(())
    }
}

/// A task with its delivery attempt count.
#[derive(Debug)]
pub struct QueuedTask {
    pub task: ImportTask,
    pub attempts: u32,
}

/// Delivery attempts before a task is dropped.
pub const MAX_ATTEMPTS: u32 = 3;

/// In-process queue over an unbounded channel.
pub struct LocalQueue {
    tx: mpsc::UnboundedSender<QueuedTask>,
}

impl LocalQueue {
    /// Create the queue and the receiver half for a worker.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<QueuedTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl TaskQueue for LocalQueue {
    async fn enqueue(&self, task: ImportTask) -> Result<()> {
        self.tx
            .send(QueuedTask { task, attempts: 0 })
            .map_err(|_| Error::Internal(anyhow::anyhow!("import worker channel closed")))
    }
}

/// Drive the importer until every queue sender is gone and the channel
/// drains. Each delivery gets up to [`MAX_ATTEMPTS`] tries; the importer
/// itself is idempotent, so redundant deliveries are harmless.
pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<QueuedTask>, importer: Arc<Importer>) {
    while let Some(mut queued) = rx.recv().await {
        loop {
            queued.attempts += 1;
            match importer.handle(&queued.task).await {
                Ok(()) => {
                    info!(uri = %queued.task.source_uri, "import complete");
                    break;
                }
                Err(e) if queued.attempts < MAX_ATTEMPTS => {
                    warn!(
                        uri = %queued.task.source_uri,
                        attempts = queued.attempts,
                        "import failed, retrying: {}",
                        e
                    );
                }
                Err(e) => {
                    error!(
                        uri = %queued.task.source_uri,
                        attempts = queued.attempts,
                        "import dropped after repeated failures: {}",
                        e
                    );
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_delivers_task() {
        let (queue, mut rx) = LocalQueue::new();
        queue
            .enqueue(ImportTask {
                parent_guid: "p1".to_string(),
                source_uri: "https://origin.example.com/a.mp3".to_string(),
            })
            .await
            .unwrap();

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.task.parent_guid, "p1");
        assert_eq!(queued.attempts, 0);
    }

    #[tokio::test]
    async fn test_noop_queue_accepts_and_drops() {
        NoopQueue
            .enqueue(ImportTask {
                parent_guid: "p1".to_string(),
                source_uri: "https://origin.example.com/a.mp3".to_string(),
            })
            .await
            .unwrap();
    }
}
