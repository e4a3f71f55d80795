//! Bounded-concurrency FIFO task queue with retry, abort and progress events.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{QueueError, WorkError};
use crate::progress::{ProgressObserver, ProgressSnapshot, QueueStats};
use crate::task::{TaskHandle, WorkContext, WorkItem, WorkMetadata};
use crate::worker::run_attempt;

/// A queued task and its reply channel.
struct Entry<T> {
    id: Uuid,
    item: Arc<dyn WorkItem<Output = T>>,
    metadata: WorkMetadata,
    attempts: u32,
    reply: oneshot::Sender<Result<T, QueueError>>,
}

/// Mutable scheduler state. `active` counts entries holding a slot, including
/// entries waiting out a retry delay.
struct QueueState<T> {
    pending: VecDeque<Entry<T>>,
    active: usize,
    aborted: bool,
    /// Fired by `abort` to cut retry delays short.
    abort_signal: CancellationToken,
    completed: usize,
    errors: usize,
    total: usize,
}

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            active: 0,
            aborted: false,
            abort_signal: CancellationToken::new(),
            completed: 0,
            errors: 0,
            total: 0,
        }
    }

    fn stats(&self) -> QueueStats {
        QueueStats {
            completed: self.completed,
            errors: self.errors,
            pending: self.pending.len(),
            active: self.active,
            total: self.total,
        }
    }
}

struct Inner<T> {
    config: QueueConfig,
    state: Mutex<QueueState<T>>,
    observers: RwLock<Vec<Arc<dyn ProgressObserver>>>,
}

/// Bounded-concurrency task queue serving one logical batch job.
///
/// At most `concurrency` tasks hold a slot at any time. Failed tasks with a
/// retryable error keep their slot through the backoff delay and are then put
/// back at the front of the pending list, ahead of work that has not started.
/// Must be used from within a tokio runtime.
pub struct TaskQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> TaskQueue<T> {
    /// Create a new task queue.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(QueueState::new()),
                observers: RwLock::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Register an observer for progress and error events.
    pub fn add_observer(&self, observer: Arc<dyn ProgressObserver>) {
        self.inner.observers.write().push(observer);
    }

    /// Enqueue a work item.
    pub fn enqueue<W>(&self, item: W, metadata: WorkMetadata) -> TaskHandle<T>
    where
        W: WorkItem<Output = T> + 'static,
    {
        self.enqueue_arc(Arc::new(item), metadata)
    }

    /// Enqueue a shared work item.
    pub fn enqueue_arc(
        &self,
        item: Arc<dyn WorkItem<Output = T>>,
        metadata: WorkMetadata,
    ) -> TaskHandle<T> {
        let id = Uuid::new_v4();
        let (reply, rx) = oneshot::channel();
        let handle = TaskHandle::new(id, metadata.clone(), rx);

        let rejected = {
            let mut state = self.inner.state.lock();
            state.total += 1;
            if state.aborted {
                state.errors += 1;
                Some((reply, ProgressSnapshot::from_stats(state.stats())))
            } else {
                state.pending.push_back(Entry {
                    id,
                    item,
                    metadata,
                    attempts: 0,
                    reply,
                });
                None
            }
        };

        match rejected {
            Some((reply, snapshot)) => {
                debug!("Rejecting task {}: queue aborted", id);
                self.inner.notify_error(handle.metadata(), &QueueError::Aborted);
                self.inner.notify_progress(&snapshot);
                let _ = reply.send(Err(QueueError::Aborted));
            }
            None => {
                debug!("Enqueued task {} ({})", id, handle.metadata().label);
                self.inner.schedule();
            }
        }

        handle
    }

    /// Enqueue every item and wait until all of them settle.
    ///
    /// Results are returned in submission order.
    pub async fn enqueue_all<I>(&self, items: I) -> Vec<Result<T, QueueError>>
    where
        I: IntoIterator<Item = (Arc<dyn WorkItem<Output = T>>, WorkMetadata)>,
    {
        let handles: Vec<TaskHandle<T>> = items
            .into_iter()
            .map(|(item, metadata)| self.enqueue_arc(item, metadata))
            .collect();
        join_all(handles.into_iter().map(TaskHandle::join)).await
    }

    /// Stop scheduling and reject every pending task with [`QueueError::Aborted`].
    ///
    /// Tasks already holding a slot run to their natural end but get no further
    /// retries; tasks waiting out a retry delay resolve right away. Returns the
    /// number of rejected tasks.
    pub fn abort(&self) -> usize {
        let (drained, snapshot) = {
            let mut state = self.inner.state.lock();
            state.aborted = true;
            state.abort_signal.cancel();
            let drained: Vec<Entry<T>> = state.pending.drain(..).collect();
            state.errors += drained.len();
            (drained, ProgressSnapshot::from_stats(state.stats()))
        };

        let count = drained.len();
        info!("Queue aborted, {} pending task(s) rejected", count);

        for entry in &drained {
            self.inner.notify_error(&entry.metadata, &QueueError::Aborted);
        }
        self.inner.notify_progress(&snapshot);
        for entry in drained {
            let _ = entry.reply.send(Err(QueueError::Aborted));
        }

        count
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.is_aborted()
    }

    /// Current counters.
    pub fn stats(&self) -> QueueStats {
        self.inner.state.lock().stats()
    }

    /// Clear counters and the aborted flag so the queue can serve a new job.
    pub fn reset(&self) -> Result<(), QueueError> {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.active > 0 {
                return Err(QueueError::Busy(state.active));
            }
            let drained: Vec<Entry<T>> = state.pending.drain(..).collect();
            *state = QueueState::new();
            drained
        };

        for entry in drained {
            let _ = entry.reply.send(Err(QueueError::Aborted));
        }
        info!("Queue reset");
        Ok(())
    }
}

impl<T: Send + 'static> Inner<T> {
    fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    fn abort_signal(&self) -> CancellationToken {
        self.state.lock().abort_signal.clone()
    }

    /// Start pending entries while slots are free.
    fn schedule(self: &Arc<Self>) {
        let mut started = Vec::new();
        {
            let mut state = self.state.lock();
            while !state.aborted && state.active < self.config.concurrency {
                let Some(entry) = state.pending.pop_front() else {
                    break;
                };
                state.active += 1;
                started.push(entry);
            }
        }

        for entry in started {
            tokio::spawn(Arc::clone(self).run(entry));
        }
    }

    async fn run(self: Arc<Self>, mut entry: Entry<T>) {
        let ctx = WorkContext::new(entry.id, entry.attempts + 1, entry.metadata.clone());
        let outcome = run_attempt(Arc::clone(&entry.item), ctx, &self.config).await;

        match outcome {
            Ok(value) => self.finish(entry, Ok(value)),
            Err(error) => {
                entry.attempts += 1;
                let aborted = self.is_aborted();

                if error.is_retryable() && entry.attempts <= self.config.retry_count && !aborted {
                    let delay = self.config.retry_delay(entry.attempts);
                    warn!(
                        "Task {} failed (attempt {}/{}): {}, retrying in {:?}",
                        entry.id,
                        entry.attempts,
                        self.config.retry_count + 1,
                        error,
                        delay
                    );
                    let abort_signal = self.abort_signal();
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = abort_signal.cancelled() => {}
                    }
                    self.requeue(entry, error);
                } else {
                    let attempts = entry.attempts;
                    self.finish(
                        entry,
                        Err(QueueError::Failed {
                            attempts,
                            source: error,
                        }),
                    );
                }
            }
        }
    }

    /// Put a backed-off entry at the front of the pending list, unless the
    /// queue was aborted meanwhile.
    fn requeue(self: &Arc<Self>, entry: Entry<T>, last_error: WorkError) {
        let declined = {
            let mut state = self.state.lock();
            if state.aborted {
                Some(entry)
            } else {
                state.active -= 1;
                state.pending.push_front(entry);
                None
            }
        };

        match declined {
            Some(entry) => {
                debug!("Queue aborted during backoff, not retrying task {}", entry.id);
                let attempts = entry.attempts;
                self.finish(
                    entry,
                    Err(QueueError::Failed {
                        attempts,
                        source: last_error,
                    }),
                );
            }
            None => self.schedule(),
        }
    }

    /// Resolve an entry, release its slot and schedule more work.
    fn finish(self: &Arc<Self>, entry: Entry<T>, result: Result<T, QueueError>) {
        let snapshot = {
            let mut state = self.state.lock();
            state.active -= 1;
            if result.is_ok() {
                state.completed += 1;
            } else {
                state.errors += 1;
            }
            ProgressSnapshot::from_stats(state.stats())
        };

        match &result {
            Ok(_) => debug!("Task {} completed", entry.id),
            Err(e) => {
                error!("Task {} ({}) failed: {}", entry.id, entry.metadata.label, e);
                self.notify_error(&entry.metadata, e);
            }
        }

        self.notify_progress(&snapshot);
        let _ = entry.reply.send(result);
        self.schedule();
    }

    fn observers(&self) -> Vec<Arc<dyn ProgressObserver>> {
        self.observers.read().clone()
    }

    fn notify_progress(&self, snapshot: &ProgressSnapshot) {
        for observer in self.observers() {
            observer.on_progress(snapshot);
        }
    }

    fn notify_error(&self, metadata: &WorkMetadata, error: &QueueError) {
        for observer in self.observers() {
            observer.on_error(metadata, error);
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
