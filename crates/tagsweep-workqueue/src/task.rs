//! Work items and their handles.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{QueueError, WorkError};

/// Free-form description of a work item, echoed back in progress and error events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkMetadata {
    /// Human-readable label.
    pub label: String,
    /// Zero-based position of this batch.
    pub batch_index: usize,
    /// Number of batches in the job.
    pub total_batches: usize,
    /// Records carried by this item.
    pub item_count: usize,
}

impl WorkMetadata {
    /// Create metadata with a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Set batch position.
    pub fn with_batch(mut self, index: usize, total: usize) -> Self {
        self.batch_index = index;
        self.total_batches = total;
        self
    }

    /// Set record count.
    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = count;
        self
    }
}

/// Per-attempt execution context handed to a work item.
#[derive(Debug, Clone)]
pub struct WorkContext {
    /// Queue-assigned task ID, stable across retries.
    pub task_id: Uuid,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Metadata supplied at enqueue time.
    pub metadata: WorkMetadata,
    cancel: CancellationToken,
}

impl WorkContext {
    /// Create a context with a fresh cancellation token.
    pub fn new(task_id: Uuid, attempt: u32, metadata: WorkMetadata) -> Self {
        Self {
            task_id,
            attempt,
            metadata,
            cancel: CancellationToken::new(),
        }
    }

    /// Token fired when the queue gives up on this attempt.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A unit of work the queue can run, time out and retry.
#[async_trait]
pub trait WorkItem: Send + Sync {
    /// Value produced on success.
    type Output: Send + 'static;

    /// Run one attempt.
    async fn execute(&self, ctx: &WorkContext) -> Result<Self::Output, WorkError>;
}

/// Adapter turning an async closure into a [`WorkItem`].
pub struct FnWorkItem<F> {
    func: F,
}

impl<F> FnWorkItem<F> {
    pub fn new<Fut, T>(func: F) -> Self
    where
        F: Fn(WorkContext) -> Fut,
        Fut: Future<Output = Result<T, WorkError>>,
    {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut, T> WorkItem for FnWorkItem<F>
where
    F: Fn(WorkContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn execute(&self, ctx: &WorkContext) -> Result<T, WorkError> {
        (self.func)(ctx.clone()).await
    }
}

/// Handle resolving once the queued task reaches a terminal state.
pub struct TaskHandle<T> {
    id: Uuid,
    metadata: WorkMetadata,
    rx: oneshot::Receiver<Result<T, QueueError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(
        id: Uuid,
        metadata: WorkMetadata,
        rx: oneshot::Receiver<Result<T, QueueError>>,
    ) -> Self {
        Self { id, metadata, rx }
    }

    /// Queue-assigned task ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn metadata(&self) -> &WorkMetadata {
        &self.metadata
    }

    /// Wait for the terminal outcome.
    pub async fn join(self) -> Result<T, QueueError> {
        self.rx.await.unwrap_or(Err(QueueError::Dropped))
    }
}
