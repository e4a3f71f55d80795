//! Aggregated outcome of a bulk edit.

use std::time::Duration;

use tagsweep_remote::RemoteResponse;
use tagsweep_workqueue::{QueueError, WorkMetadata};

use crate::request::ChunkRequest;

/// A chunk that did not succeed.
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub request: ChunkRequest,
    pub metadata: WorkMetadata,
    pub error: QueueError,
}

impl ChunkFailure {
    pub fn is_aborted(&self) -> bool {
        self.error.is_aborted()
    }
}

/// Summary of a finished bulk edit.
///
/// For queued edits `processed_item_estimate` counts every succeeded chunk as a
/// full batch and so overstates the work when the last chunk is short. An edit
/// that fits in one chunk is sent directly and its estimate is that chunk's
/// record count. `acknowledged_items` is the exact number of records the
/// server reported back.
#[derive(Debug, Clone, Default)]
pub struct OperationResult {
    pub total_chunks: usize,
    pub succeeded_chunks: usize,
    pub failed_chunks: Vec<ChunkFailure>,
    pub batch_size: usize,
    /// `succeeded_chunks * batch_size`, or the record count for a direct edit.
    pub processed_item_estimate: usize,
    pub acknowledged_items: usize,
    pub elapsed: Duration,
}

impl OperationResult {
    pub(crate) fn new(batch_size: usize, total_chunks: usize) -> Self {
        Self {
            total_chunks,
            batch_size,
            ..Default::default()
        }
    }

    pub(crate) fn record(
        &mut self,
        request: ChunkRequest,
        metadata: WorkMetadata,
        outcome: Result<RemoteResponse, QueueError>,
    ) {
        match outcome {
            Ok(response) => {
                self.succeeded_chunks += 1;
                self.acknowledged_items += response.acknowledged_ids.len();
            }
            Err(error) => self.failed_chunks.push(ChunkFailure {
                request,
                metadata,
                error,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_chunks.is_empty()
    }

    /// Chunks rejected because the job was aborted before they started.
    pub fn aborted_chunks(&self) -> usize {
        self.failed_chunks.iter().filter(|f| f.is_aborted()).count()
    }

    /// Record ids of every failed chunk, in chunk order.
    pub fn failed_record_ids(&self) -> Vec<String> {
        self.failed_chunks
            .iter()
            .flat_map(|f| f.request.ids.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tagsweep_workqueue::WorkError;

    use crate::request::{BulkMode, EntityKind, RelationField};

    fn request(ids: &[&str]) -> ChunkRequest {
        ChunkRequest {
            kind: EntityKind::Scene,
            field: RelationField::Tags,
            mode: BulkMode::Add,
            ids: ids.iter().map(|s| s.to_string()).collect(),
            related_ids: vec!["t".to_string()],
        }
    }

    #[test]
    fn test_record_outcomes() {
        let mut result = OperationResult::new(2, 3);
        result.record(
            request(&["1", "2"]),
            WorkMetadata::new("a"),
            Ok(RemoteResponse {
                data: json!({}),
                acknowledged_ids: vec!["1".to_string(), "2".to_string()],
            }),
        );
        result.record(
            request(&["3", "4"]),
            WorkMetadata::new("b"),
            Err(QueueError::Failed {
                attempts: 1,
                source: WorkError::Semantic("bad".to_string()),
            }),
        );
        result.record(request(&["5"]), WorkMetadata::new("c"), Err(QueueError::Aborted));

        assert_eq!(result.succeeded_chunks, 1);
        assert_eq!(result.acknowledged_items, 2);
        assert_eq!(result.failed_chunks.len(), 2);
        assert_eq!(result.aborted_chunks(), 1);
        assert!(!result.is_success());
        assert_eq!(result.failed_record_ids(), vec!["3", "4", "5"]);
    }
}
