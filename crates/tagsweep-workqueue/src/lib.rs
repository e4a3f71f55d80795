//! # tagsweep Work Queue
//!
//! Bounded-concurrency task queue used to fan bulk edits out to the remote server.
//!
//! ## Features
//!
//! - FIFO scheduling with at most `concurrency` tasks in flight
//! - Queue-level task timeout with cooperative cancellation
//! - Exponential backoff retries that jump ahead of not-yet-started work
//! - Abort, reset and live statistics
//! - Progress snapshots and a percentage/ETA reporter

pub mod config;
pub mod error;
pub mod progress;
pub mod queue;
pub mod task;
mod worker;

pub use config::{QueueConfig, TimeoutPolicy};
pub use error::{QueueError, WorkError};
pub use progress::{
    FnObserver, ProgressFigures, ProgressObserver, ProgressReporter, ProgressSnapshot, QueueStats,
};
pub use queue::TaskQueue;
pub use task::{FnWorkItem, TaskHandle, WorkContext, WorkItem, WorkMetadata};

// Re-export CancellationToken for work item implementations
pub use tokio_util::sync::CancellationToken;
