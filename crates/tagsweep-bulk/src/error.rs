//! Bulk edit errors.

use thiserror::Error;

use tagsweep_workqueue::QueueError;

use crate::request::{EntityKind, RelationField};

/// Errors raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkError {
    /// Chunks must hold at least one record.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(usize),

    /// The entity has no such bulk-editable relation.
    #[error("{kind} records have no bulk-editable {field}")]
    UnsupportedField {
        kind: EntityKind,
        field: RelationField,
    },

    /// The edit is well-formed but meaningless.
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// A value could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The task queue rejected its configuration.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}
