//! Bulk relationship edits for tagsweep.
//!
//! A [`BulkEdit`] names the records to change, the relation to touch and how to
//! apply the related ids. The [`BulkMutationCoordinator`] splits the records
//! into chunks, runs one [`ChunkMutation`] per chunk on a bounded
//! [`TaskQueue`](tagsweep_workqueue::TaskQueue) and folds the outcomes into an
//! [`OperationResult`].

pub mod coordinator;
pub mod error;
pub mod job;
pub mod mutation;
pub mod options;
pub mod partition;
pub mod request;
pub mod result;

pub use coordinator::{BulkEdit, BulkMutationCoordinator, apply_bulk_edit};
pub use error::BulkError;
pub use job::{AbortHandle, BulkJob};
pub use mutation::ChunkMutation;
pub use options::BulkOptions;
pub use partition::partition;
pub use request::{BulkMode, ChunkRequest, EntityKind, RelationField};
pub use result::{ChunkFailure, OperationResult};
