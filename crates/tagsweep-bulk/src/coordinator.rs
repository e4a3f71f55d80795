//! Splitting a bulk edit into chunks and running them.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use tagsweep_remote::{CancellationToken, RemoteExecutor};
use tagsweep_workqueue::{ProgressObserver, ProgressSnapshot, QueueError, QueueStats, TaskQueue, WorkMetadata};

use crate::error::BulkError;
use crate::job::{BulkJob, Execution};
use crate::mutation::{ChunkMutation, into_work_error};
use crate::options::BulkOptions;
use crate::partition::partition;
use crate::request::{BulkMode, ChunkRequest, EntityKind, RelationField};
use crate::result::OperationResult;

/// A relationship change applied to many records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEdit {
    pub kind: EntityKind,
    pub field: RelationField,
    pub mode: BulkMode,
    pub record_ids: Vec<String>,
    pub related_ids: Vec<String>,
}

impl BulkEdit {
    pub fn new(kind: EntityKind, field: RelationField, mode: BulkMode) -> Self {
        Self {
            kind,
            field,
            mode,
            record_ids: Vec::new(),
            related_ids: Vec::new(),
        }
    }

    pub fn with_records<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_related<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// `SET` with no related ids clears the relation; `ADD` and `REMOVE` need ids.
    pub fn validate(&self) -> Result<(), BulkError> {
        if !self.kind.supports(self.field) {
            return Err(BulkError::UnsupportedField {
                kind: self.kind,
                field: self.field,
            });
        }
        if self.related_ids.is_empty() && self.mode != BulkMode::Set {
            return Err(BulkError::InvalidEdit(format!(
                "{} needs at least one related id",
                self.mode
            )));
        }
        Ok(())
    }

    fn label(&self) -> String {
        format!("{} {} {}", self.mode, self.kind, self.field)
    }
}

/// Runs bulk edits through a shared executor.
pub struct BulkMutationCoordinator {
    executor: Arc<RemoteExecutor>,
    options: BulkOptions,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl BulkMutationCoordinator {
    pub fn new(executor: Arc<RemoteExecutor>, options: BulkOptions) -> Result<Self, BulkError> {
        options.validate()?;
        Ok(Self {
            executor,
            options,
            observers: Vec::new(),
        })
    }

    /// Register an observer for every job started by this coordinator.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn options(&self) -> &BulkOptions {
        &self.options
    }

    /// The chunk requests `edit` would be sent as, in order.
    pub fn plan(&self, edit: &BulkEdit) -> Result<Vec<ChunkRequest>, BulkError> {
        edit.validate()?;
        let chunks = partition(&edit.record_ids, self.options.batch_size)?;
        Ok(chunks
            .into_iter()
            .map(|ids| ChunkRequest {
                kind: edit.kind,
                field: edit.field,
                mode: edit.mode,
                ids,
                related_ids: edit.related_ids.clone(),
            })
            .collect())
    }

    /// Start `edit` and return a handle to abort or wait for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, edit: &BulkEdit) -> Result<BulkJob, BulkError> {
        let mut chunks = self.plan(edit)?;
        let total = chunks.len();
        let batch_size = self.options.batch_size;

        info!(
            "Starting bulk {} on {} {} record(s) in {} chunk(s)",
            edit.label(),
            edit.record_ids.len(),
            edit.kind,
            total
        );

        let execution = match total {
            0 => Execution::Empty,
            1 => {
                let request = chunks.remove(0);
                let metadata = WorkMetadata::new(format!("{} batch 1/1", edit.label()))
                    .with_batch(0, 1)
                    .with_item_count(request.ids.len());
                self.run_direct(request, metadata)
            }
            _ => self.run_queued(edit, chunks)?,
        };

        Ok(BulkJob::new(execution, batch_size, total))
    }

    /// Start `edit` and wait for the result.
    pub async fn apply(&self, edit: &BulkEdit) -> Result<OperationResult, BulkError> {
        Ok(self.start(edit)?.wait().await)
    }

    fn run_direct(&self, request: ChunkRequest, metadata: WorkMetadata) -> Execution {
        let stats = Arc::new(Mutex::new(QueueStats {
            active: 1,
            total: 1,
            ..Default::default()
        }));

        let executor = Arc::clone(&self.executor);
        let observers = self.observers.clone();
        let remote = request.to_remote_request();
        let task_stats = Arc::clone(&stats);
        let task_metadata = metadata.clone();

        let handle = tokio::spawn(async move {
            let outcome = executor
                .execute(&remote, &CancellationToken::new())
                .await
                .map_err(|e| QueueError::Failed {
                    attempts: 1,
                    source: into_work_error(e),
                });

            let snapshot = {
                let mut stats = task_stats.lock();
                stats.active = 0;
                if outcome.is_ok() {
                    stats.completed = 1;
                } else {
                    stats.errors = 1;
                }
                ProgressSnapshot::from_stats(*stats)
            };

            if let Err(e) = &outcome {
                for observer in &observers {
                    observer.on_error(&task_metadata, e);
                }
            }
            for observer in &observers {
                observer.on_progress(&snapshot);
            }
            outcome
        });

        Execution::Direct {
            request,
            metadata,
            stats,
            handle,
        }
    }

    fn run_queued(&self, edit: &BulkEdit, chunks: Vec<ChunkRequest>) -> Result<Execution, BulkError> {
        let queue = TaskQueue::new(self.options.queue.clone())?;
        for observer in &self.observers {
            queue.add_observer(Arc::clone(observer));
        }

        let total = chunks.len();
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                let metadata = WorkMetadata::new(format!(
                    "{} batch {}/{}",
                    edit.label(),
                    index + 1,
                    total
                ))
                .with_batch(index, total)
                .with_item_count(request.ids.len());
                let item = ChunkMutation::new(Arc::clone(&self.executor), request.clone());
                (request, queue.enqueue(item, metadata))
            })
            .collect();

        Ok(Execution::Queued { queue, chunks })
    }
}

/// Apply `edit` once with a fresh coordinator.
pub async fn apply_bulk_edit(
    executor: Arc<RemoteExecutor>,
    edit: &BulkEdit,
    options: BulkOptions,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<OperationResult, BulkError> {
    let mut coordinator = BulkMutationCoordinator::new(executor, options)?;
    if let Some(observer) = observer {
        coordinator = coordinator.with_observer(observer);
    }
    coordinator.apply(edit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagsweep_remote::{ExecutorConfig, HttpTransport};

    fn coordinator(batch_size: usize) -> BulkMutationCoordinator {
        let executor = Arc::new(RemoteExecutor::new(
            Arc::new(HttpTransport::new("http://127.0.0.1:1/graphql")),
            ExecutorConfig::default(),
        ));
        BulkMutationCoordinator::new(executor, BulkOptions::default().with_batch_size(batch_size))
            .unwrap()
    }

    #[test]
    fn test_plan_chunks_records() {
        let edit = BulkEdit::new(EntityKind::Scene, RelationField::Tags, BulkMode::Add)
            .with_records((0..7).map(|i| i.to_string()))
            .with_related(["t1", "t2"]);
        let plan = coordinator(3).plan(&edit).unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].ids, vec!["0", "1", "2"]);
        assert_eq!(plan[2].ids, vec!["6"]);
        assert!(plan.iter().all(|c| c.related_ids == vec!["t1", "t2"]));
    }

    #[test]
    fn test_validate_unsupported_field() {
        let edit = BulkEdit::new(EntityKind::Performer, RelationField::Galleries, BulkMode::Add)
            .with_records(["1"])
            .with_related(["2"]);
        assert_eq!(
            edit.validate(),
            Err(BulkError::UnsupportedField {
                kind: EntityKind::Performer,
                field: RelationField::Galleries,
            })
        );
    }

    #[test]
    fn test_validate_related_ids() {
        let add = BulkEdit::new(EntityKind::Image, RelationField::Tags, BulkMode::Add).with_records(["1"]);
        assert!(matches!(add.validate(), Err(BulkError::InvalidEdit(_))));

        let clear = BulkEdit::new(EntityKind::Image, RelationField::Tags, BulkMode::Set).with_records(["1"]);
        assert!(clear.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let executor = Arc::new(RemoteExecutor::new(
            Arc::new(HttpTransport::new("http://127.0.0.1:1/graphql")),
            ExecutorConfig::default(),
        ));
        let result = BulkMutationCoordinator::new(executor, BulkOptions::default().with_batch_size(0));
        assert!(matches!(result, Err(BulkError::InvalidBatchSize(0))));
    }

    #[tokio::test]
    async fn test_empty_edit_sends_nothing() {
        let edit = BulkEdit::new(EntityKind::Scene, RelationField::Tags, BulkMode::Add).with_related(["t"]);
        let result = coordinator(50).apply(&edit).await.unwrap();

        assert_eq!(result.total_chunks, 0);
        assert_eq!(result.succeeded_chunks, 0);
        assert!(result.is_success());
    }
}
