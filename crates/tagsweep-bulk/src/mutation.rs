//! Work item sending one chunk through the remote executor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tagsweep_remote::{RemoteError, RemoteExecutor, RemoteRequest, RemoteResponse};
use tagsweep_workqueue::{WorkContext, WorkError, WorkItem};

use crate::request::ChunkRequest;

/// One chunk of a bulk edit as a queue work item.
pub struct ChunkMutation {
    executor: Arc<RemoteExecutor>,
    request: ChunkRequest,
    remote: RemoteRequest,
}

impl ChunkMutation {
    pub fn new(executor: Arc<RemoteExecutor>, request: ChunkRequest) -> Self {
        let remote = request.to_remote_request();
        Self {
            executor,
            request,
            remote,
        }
    }

    pub fn request(&self) -> &ChunkRequest {
        &self.request
    }
}

#[async_trait]
impl WorkItem for ChunkMutation {
    type Output = RemoteResponse;

    async fn execute(&self, ctx: &WorkContext) -> Result<RemoteResponse, WorkError> {
        debug!(
            "Sending {} for {} record(s) (attempt {})",
            self.remote.operation_name,
            self.request.ids.len(),
            ctx.attempt
        );
        self.executor
            .execute(&self.remote, ctx.cancellation())
            .await
            .map_err(into_work_error)
    }
}

/// Map executor outcomes onto the queue's retry classification.
pub(crate) fn into_work_error(error: RemoteError) -> WorkError {
    match error {
        RemoteError::Transient(e) => WorkError::Transient(e.to_string()),
        RemoteError::Semantic(message) => WorkError::Semantic(message),
        RemoteError::Cancelled => WorkError::Cancelled,
    }
}
