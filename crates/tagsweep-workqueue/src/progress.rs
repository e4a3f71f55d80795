//! Queue statistics, progress snapshots and the percentage/ETA reporter.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::QueueError;
use crate::task::WorkMetadata;

/// Point-in-time counters of one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks resolved successfully.
    pub completed: usize,
    /// Tasks resolved with a terminal error (including aborts).
    pub errors: usize,
    /// Tasks waiting for a slot.
    pub pending: usize,
    /// Tasks holding a slot (running or waiting out a retry delay).
    pub active: usize,
    /// Tasks ever submitted since construction or the last reset.
    pub total: usize,
}

impl QueueStats {
    /// Tasks in a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.errors
    }

    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.active == 0
    }
}

/// Progress event emitted after every terminal task resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub errors: usize,
    /// Tasks not yet started.
    pub remaining: usize,
    pub active: usize,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Snapshot the given counters now.
    pub fn from_stats(stats: QueueStats) -> Self {
        Self {
            completed: stats.completed,
            errors: stats.errors,
            remaining: stats.pending,
            active: stats.active,
            total: stats.total,
            timestamp: Utc::now(),
        }
    }

    pub fn finished(&self) -> usize {
        self.completed + self.errors
    }
}

/// Receives queue events. Both methods default to no-ops.
pub trait ProgressObserver: Send + Sync {
    /// Called after every terminal task resolution.
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {}

    /// Called for every task that ends without success.
    fn on_error(&self, _metadata: &WorkMetadata, _error: &QueueError) {}
}

type ProgressFn = Box<dyn Fn(&ProgressSnapshot) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&WorkMetadata, &QueueError) + Send + Sync>;

/// Observer built from closures.
#[derive(Default)]
pub struct FnObserver {
    progress: Option<ProgressFn>,
    error: Option<ErrorFn>,
}

impl FnObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress callback.
    pub fn with_progress(mut self, f: impl Fn(&ProgressSnapshot) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Set the error callback.
    pub fn with_error(
        mut self,
        f: impl Fn(&WorkMetadata, &QueueError) + Send + Sync + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl ProgressObserver for FnObserver {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if let Some(f) = &self.progress {
            f(snapshot);
        }
    }

    fn on_error(&self, metadata: &WorkMetadata, error: &QueueError) {
        if let Some(f) = &self.error {
            f(metadata, error);
        }
    }
}

/// Human-facing figures derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressFigures {
    /// Terminal tasks over total, 0..=100.
    pub percent: f64,
    /// Projected time to finish the remaining tasks at the observed rate.
    pub eta: Option<Duration>,
    pub finished: usize,
    pub total: usize,
}

impl ProgressFigures {
    /// Derive figures from a snapshot and the time spent so far.
    pub fn compute(snapshot: &ProgressSnapshot, elapsed: Duration) -> Self {
        let finished = snapshot.finished();
        let total = snapshot.total;

        let percent = if total == 0 {
            100.0
        } else {
            (finished as f64 / total as f64 * 100.0).min(100.0)
        };

        let eta = if finished == 0 {
            None
        } else {
            let left = total.saturating_sub(finished);
            Some(elapsed.mul_f64(left as f64 / finished as f64))
        };

        Self {
            percent,
            eta,
            finished,
            total,
        }
    }
}

/// Passive progress sink that keeps the latest snapshot and logs figures.
///
/// Snapshots from concurrent resolutions can arrive out of order; one that has
/// fewer finished tasks than the stored snapshot is logged but not kept. The
/// ETA clock starts at the first snapshot.
pub struct ProgressReporter {
    label: String,
    started: Mutex<Option<Instant>>,
    latest: Mutex<Option<ProgressSnapshot>>,
    failures: Mutex<Vec<(WorkMetadata, String)>>,
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Mutex::new(None),
            latest: Mutex::new(None),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Latest snapshot seen.
    pub fn latest(&self) -> Option<ProgressSnapshot> {
        self.latest.lock().clone()
    }

    /// Figures for the latest snapshot.
    pub fn figures(&self) -> Option<ProgressFigures> {
        let elapsed = self.elapsed();
        self.latest()
            .map(|snapshot| ProgressFigures::compute(&snapshot, elapsed))
    }

    /// Forget the stored snapshot, failures and clock before reuse on another job.
    pub fn clear(&self) {
        *self.started.lock() = None;
        *self.latest.lock() = None;
        self.failures.lock().clear();
    }

    fn elapsed(&self) -> Duration {
        self.started
            .lock()
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Failures reported so far, as (metadata, error message).
    pub fn failures(&self) -> Vec<(WorkMetadata, String)> {
        self.failures.lock().clone()
    }
}

impl ProgressObserver for ProgressReporter {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        let elapsed = self.started.lock().get_or_insert_with(Instant::now).elapsed();
        let figures = ProgressFigures::compute(snapshot, elapsed);
        info!(
            "{}: {}/{} done ({:.1}%), {} failed, {} active, eta {:?}",
            self.label,
            figures.finished,
            figures.total,
            figures.percent,
            snapshot.errors,
            snapshot.active,
            figures.eta
        );
        let mut latest = self.latest.lock();
        let stale = latest
            .as_ref()
            .is_some_and(|current| snapshot.finished() < current.finished());
        if !stale {
            *latest = Some(snapshot.clone());
        }
    }

    fn on_error(&self, metadata: &WorkMetadata, error: &QueueError) {
        warn!(
            "{}: batch {}/{} ({} items) failed: {}",
            self.label,
            metadata.batch_index + 1,
            metadata.total_batches,
            metadata.item_count,
            error
        );
        self.failures.lock().push((metadata.clone(), error.to_string()));
    }
}
