//! Request execution with timeout, transient retry and cancellation.

use std::sync::Arc;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::error::{RemoteError, TransientError};
use crate::request::{RemoteRequest, RemoteResponse};
use crate::transport::Transport;

/// Executes remote mutations through a shared transport.
///
/// Each call gets up to `retry_attempts + 1` attempts. Only transient errors are
/// retried; the cancellation token is checked while a request is in flight and
/// while waiting out a backoff delay.
pub struct RemoteExecutor {
    transport: Arc<dyn Transport>,
    config: ExecutorConfig,
}

impl RemoteExecutor {
    pub fn new(transport: Arc<dyn Transport>, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `request`, retrying transient failures.
    pub async fn execute(
        &self,
        request: &RemoteRequest,
        cancel: &CancellationToken,
    ) -> Result<RemoteResponse, RemoteError> {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RemoteError::Cancelled),
                result = self.attempt(request) => result,
            };

            match result {
                Ok(response) => {
                    debug!(
                        "{} succeeded on attempt {}, {} record(s) acknowledged",
                        request.operation_name,
                        attempt,
                        response.acknowledged_ids.len()
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        "Remote error (attempt {}/{}): {}, retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One request bounded by the request timeout. The in-flight call is
    /// dropped when the timeout expires.
    async fn attempt(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        let limit = self.config.request_timeout();
        match timeout(limit, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransientError::Timeout(limit).into()),
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
