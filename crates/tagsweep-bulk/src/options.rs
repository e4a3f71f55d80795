//! Bulk edit options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tagsweep_workqueue::QueueConfig;

use crate::error::BulkError;

/// Chunking and queue settings for one bulk edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOptions {
    /// Records per chunk.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Queue concurrency, retry and timeout settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

fn default_batch_size() -> usize {
    50
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            queue: QueueConfig::default(),
        }
    }
}

impl BulkOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.queue.concurrency = concurrency;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.queue.retry_count = retry_count;
        self
    }

    /// Per-chunk watchdog timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.queue.task_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn validate(&self) -> Result<(), BulkError> {
        if self.batch_size == 0 {
            return Err(BulkError::InvalidBatchSize(0));
        }
        self.queue.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BulkOptions::default();
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.queue.concurrency, 4);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let options = BulkOptions::default()
            .with_batch_size(20)
            .with_concurrency(2)
            .with_retry_count(0)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(options.batch_size, 20);
        assert_eq!(options.queue.concurrency, 2);
        assert_eq!(options.queue.retry_count, 0);
        assert_eq!(options.queue.task_timeout_ms, 5_000);
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            BulkOptions::default().with_batch_size(0).validate(),
            Err(BulkError::InvalidBatchSize(0))
        );
        assert!(matches!(
            BulkOptions::default().with_concurrency(0).validate(),
            Err(BulkError::Queue(_))
        ));
    }
}
