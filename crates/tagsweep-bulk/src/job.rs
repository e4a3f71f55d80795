//! Handle to a running bulk edit.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tagsweep_remote::RemoteResponse;
use tagsweep_workqueue::{QueueError, QueueStats, TaskHandle, TaskQueue, WorkError, WorkMetadata};

use crate::request::ChunkRequest;
use crate::result::OperationResult;

pub(crate) enum Execution {
    /// Nothing to send.
    Empty,
    /// A single chunk sent straight to the executor.
    Direct {
        request: ChunkRequest,
        metadata: WorkMetadata,
        stats: Arc<Mutex<QueueStats>>,
        handle: JoinHandle<Result<RemoteResponse, QueueError>>,
    },
    /// Chunks running on a task queue.
    Queued {
        queue: TaskQueue<RemoteResponse>,
        chunks: Vec<(ChunkRequest, TaskHandle<RemoteResponse>)>,
    },
}

/// Cloneable handle that aborts a job from another task.
#[derive(Clone)]
pub struct AbortHandle {
    queue: Option<TaskQueue<RemoteResponse>>,
}

impl AbortHandle {
    /// See [`BulkJob::abort`].
    pub fn abort(&self) -> usize {
        match &self.queue {
            Some(queue) => queue.abort(),
            None => {
                debug!("Nothing queued to abort, in-flight work will finish");
                0
            }
        }
    }
}

/// A started bulk edit.
///
/// Dropping the job does not stop chunks that are already queued.
pub struct BulkJob {
    execution: Execution,
    batch_size: usize,
    total_chunks: usize,
    started: Instant,
}

impl BulkJob {
    pub(crate) fn new(execution: Execution, batch_size: usize, total_chunks: usize) -> Self {
        Self {
            execution,
            batch_size,
            total_chunks,
            started: Instant::now(),
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    /// Reject every chunk that has not started yet.
    ///
    /// Chunks already in flight finish normally. Returns the number of rejected
    /// chunks.
    pub fn abort(&self) -> usize {
        self.abort_handle().abort()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        let queue = match &self.execution {
            Execution::Queued { queue, .. } => Some(queue.clone()),
            _ => None,
        };
        AbortHandle { queue }
    }

    pub fn stats(&self) -> QueueStats {
        match &self.execution {
            Execution::Queued { queue, .. } => queue.stats(),
            Execution::Direct { stats, .. } => *stats.lock(),
            Execution::Empty => QueueStats::default(),
        }
    }

    /// Wait for every chunk to settle and aggregate the outcome.
    pub async fn wait(self) -> OperationResult {
        let mut result = OperationResult::new(self.batch_size, self.total_chunks);

        match self.execution {
            Execution::Empty => {}
            Execution::Direct {
                request,
                metadata,
                handle,
                ..
            } => {
                let record_count = request.ids.len();
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(QueueError::Failed {
                        attempts: 1,
                        source: WorkError::Panicked(e.to_string()),
                    }),
                };
                result.record(request, metadata, outcome);
                result.processed_item_estimate = result.succeeded_chunks * record_count;
            }
            Execution::Queued { chunks, .. } => {
                for (request, handle) in chunks {
                    let metadata = handle.metadata().clone();
                    let outcome = handle.join().await;
                    result.record(request, metadata, outcome);
                }
                result.processed_item_estimate = result.succeeded_chunks * self.batch_size;
            }
        }

        result.elapsed = self.started.elapsed();
        info!(
            "Bulk edit finished: {}/{} chunk(s) succeeded, {} failed ({} aborted), {} record(s) acknowledged in {:?}",
            result.succeeded_chunks,
            result.total_chunks,
            result.failed_chunks.len(),
            result.aborted_chunks(),
            result.acknowledged_items,
            result.elapsed
        );
        result
    }
}
