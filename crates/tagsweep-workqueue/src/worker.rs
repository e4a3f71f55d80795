//! Single-attempt execution under the queue-level watchdog.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{QueueConfig, TimeoutPolicy};
use crate::error::WorkError;
use crate::task::{WorkContext, WorkItem};

/// Run one attempt of `item`, bounded by the configured task timeout.
///
/// The attempt runs on its own tokio task so a timed-out attempt can either be
/// aborted ([`TimeoutPolicy::Cancel`]) or left to finish ([`TimeoutPolicy::Detach`]).
/// With `Cancel`, this returns only after the attempt task is gone.
pub(crate) async fn run_attempt<T: Send + 'static>(
    item: Arc<dyn WorkItem<Output = T>>,
    ctx: WorkContext,
    config: &QueueConfig,
) -> Result<T, WorkError> {
    let limit = config.task_timeout();
    let token = ctx.cancellation().clone();
    let task_id = ctx.task_id;
    let attempt = ctx.attempt;

    debug!("Starting task {} attempt {}", task_id, attempt);
    let mut handle = tokio::spawn(async move { item.execute(&ctx).await });

    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(WorkError::Panicked(join_error.to_string())),
        Err(_) => {
            match config.timeout_policy {
                TimeoutPolicy::Cancel => {
                    token.cancel();
                    handle.abort();
                    let _ = handle.await;
                    warn!(
                        "Task {} attempt {} timed out after {:?}, cancelled",
                        task_id, attempt, limit
                    );
                }
                TimeoutPolicy::Detach => {
                    warn!(
                        "Task {} attempt {} timed out after {:?}, left running in background",
                        task_id, attempt, limit
                    );
                }
            }
            Err(WorkError::Timeout(limit))
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
