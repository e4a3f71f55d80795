//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// What happens to an attempt that outlives the queue-level timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Cancel the attempt's token and abort it before any retry starts.
    #[default]
    Cancel,
    /// Leave the attempt running in the background. A retry of the same
    /// work may then overlap with it.
    Detach,
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of tasks in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Queue-level retries after the first attempt.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Per-attempt watchdog in milliseconds. Should exceed the executor's
    /// worst case, or executor retries are cut off.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    /// First retry delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any retry delay in milliseconds.
    #[serde(default = "default_delay_cap_ms")]
    pub delay_cap_ms: u64,

    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

fn default_concurrency() -> usize {
    4
}

fn default_retry_count() -> u32 {
    2
}

fn default_task_timeout_ms() -> u64 {
    120_000
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_delay_cap_ms() -> u64 {
    30_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry_count: default_retry_count(),
            task_timeout_ms: default_task_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            delay_cap_ms: default_delay_cap_ms(),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

impl QueueConfig {
    /// Per-attempt watchdog.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    /// Delay before the retry that follows failure number `attempts` (1-based):
    /// `min(base * 2^(attempts-1), cap)`.
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(63);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.delay_cap_ms))
    }

    /// Reject configurations the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.concurrency == 0 {
            return Err(QueueError::InvalidConfig(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.task_timeout_ms == 0 {
            return Err(QueueError::InvalidConfig(
                "task_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.delay_cap_ms < self.base_delay_ms {
            return Err(QueueError::InvalidConfig(
                "delay_cap_ms must not be below base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
