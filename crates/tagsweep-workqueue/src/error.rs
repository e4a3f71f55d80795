//! Queue errors.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single work item attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkError {
    /// Recoverable failure (connectivity, transport status, remote timeout).
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The remote end understood the request and rejected it.
    #[error("Rejected by server: {0}")]
    Semantic(String),

    /// Queue-level watchdog fired before the attempt finished.
    #[error("Task timeout after {0:?}")]
    Timeout(Duration),

    /// The attempt observed its cancellation token.
    #[error("Task cancelled")]
    Cancelled,

    /// The attempt panicked.
    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl WorkError {
    /// Whether resubmitting the same work unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkError::Transient(_) | WorkError::Timeout(_))
    }
}

/// Terminal outcome of a queued task that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Retries exhausted or a non-retryable failure.
    #[error("Task failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: WorkError,
    },

    /// Task was still pending when the queue was aborted.
    #[error("Queue aborted")]
    Aborted,

    /// The queue went away before resolving the task.
    #[error("Task dropped before completion")]
    Dropped,

    /// Reset requested while tasks are still running.
    #[error("Queue busy: {0} task(s) still active")]
    Busy(usize),

    /// Invalid queue configuration.
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
}

impl QueueError {
    /// Underlying attempt error, if the task actually ran.
    pub fn work_error(&self) -> Option<&WorkError> {
        match self {
            QueueError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this is an abort rejection.
    pub fn is_aborted(&self) -> bool {
        matches!(self, QueueError::Aborted)
    }
}
