//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request-level timeout and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound for a single request in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Optional cap for the backoff delay in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: None,
        }
    }
}

impl ExecutorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Backoff before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor);
        let delay = match self.max_delay_ms {
            Some(cap) => delay.min(cap),
            None => delay,
        };
        Duration::from_millis(delay)
    }

    /// Total attempts a single request may get.
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    /// Longest time `execute` can take when every attempt runs into the
    /// request timeout: all attempts plus the backoff between them.
    pub fn worst_case_duration(&self) -> Duration {
        let requests = self.request_timeout().saturating_mul(self.max_attempts());
        (1..=self.retry_attempts)
            .map(|attempt| self.retry_delay(attempt))
            .fold(requests, Duration::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.max_delay_ms, None);
    }

    #[test]
    fn test_retry_delay_uncapped() {
        let config = ExecutorConfig {
            base_delay_ms: 100,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_millis(100));
        assert_eq!(config.retry_delay(2), Duration::from_millis(200));
        assert_eq!(config.retry_delay(5), Duration::from_millis(1600));
    }

    #[test]
    fn test_retry_delay_capped() {
        let config = ExecutorConfig {
            base_delay_ms: 100,
            max_delay_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(config.retry_delay(2), Duration::from_millis(200));
        assert_eq!(config.retry_delay(3), Duration::from_millis(250));
        assert_eq!(config.retry_delay(64), Duration::from_millis(250));
    }

    #[test]
    fn test_worst_case_duration() {
        // 3 x 30s requests, then 500ms and 1s of backoff
        let config = ExecutorConfig::default();
        assert_eq!(config.worst_case_duration(), Duration::from_millis(91_500));

        let single = ExecutorConfig {
            retry_attempts: 0,
            ..Default::default()
        };
        assert_eq!(single.worst_case_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"retry_attempts": 5}"#).unwrap();
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.request_timeout_ms, 30_000);
    }
}
