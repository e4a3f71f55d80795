//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, TimeoutPolicy};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Fail with the first error, keeping warnings for the caller otherwise.
    pub fn into_result(self) -> Result<Self, ConfigError> {
        match self.errors.first() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path.clone(),
                message: error.message.clone(),
            }),
            None => Ok(self),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_executor(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_bulk(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        let endpoint = &config.server.endpoint;
        if endpoint.is_empty() {
            result.add_error(ValidationError::new(
                "server.endpoint",
                "Endpoint cannot be empty",
            ));
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            result.add_error(ValidationError::new(
                "server.endpoint",
                "endpoint must start with http:// or https://",
            ));
        }

        if config.server.api_key.as_deref() == Some("") {
            result.add_warning(ValidationWarning::new(
                "server.api_key",
                "API key is empty, requests will carry an empty ApiKey header",
            ));
        }
    }

    fn validate_executor(config: &Config, result: &mut ValidationResult) {
        let executor = &config.executor;
        if executor.request_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "executor.request_timeout_ms",
                "request_timeout_ms must be greater than 0",
            ));
        }

        if let Some(cap) = executor.max_delay_ms {
            if cap < executor.base_delay_ms {
                result.add_error(ValidationError::new(
                    "executor.max_delay_ms",
                    "max_delay_ms must not be below base_delay_ms",
                ));
            }
        }

        if executor.retry_attempts > 10 {
            result.add_warning(ValidationWarning::new(
                "executor.retry_attempts",
                "retry_attempts is very high (>10), failing chunks will take long to settle",
            ));
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        let queue = &config.queue;
        if let Err(e) = queue.validate() {
            result.add_error(ValidationError::new("queue", e.to_string()));
        }

        if queue.concurrency > 16 {
            result.add_warning(ValidationWarning::new(
                "queue.concurrency",
                "concurrency is very high (>16), this may overload the server",
            ));
        }

        let executor_budget = config.executor.worst_case_duration();
        if queue.task_timeout() <= executor_budget {
            result.add_warning(ValidationWarning::new(
                "queue.task_timeout_ms",
                format!(
                    "task_timeout_ms should exceed the executor worst case of {}ms, otherwise executor retries are cut off",
                    executor_budget.as_millis()
                ),
            ));
        }

        if queue.timeout_policy == TimeoutPolicy::Detach {
            result.add_warning(ValidationWarning::new(
                "queue.timeout_policy",
                "detach leaves timed-out chunks running, a retry may apply the same edit twice",
            ));
        }
    }

    fn validate_bulk(config: &Config, result: &mut ValidationResult) {
        if config.bulk.batch_size == 0 {
            result.add_error(ValidationError::new(
                "bulk.batch_size",
                "batch_size must be greater than 0",
            ));
        }

        if config.bulk.batch_size > 500 {
            result.add_warning(ValidationWarning::new(
                "bulk.batch_size",
                "batch_size is very high (>500), requests may hit server limits",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }

        if let Some(parent) = config.logging.file.as_ref().and_then(|f| f.parent()) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                result.add_warning(ValidationWarning::new(
                    "logging.file",
                    format!("Log directory does not exist: {:?}", parent),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
