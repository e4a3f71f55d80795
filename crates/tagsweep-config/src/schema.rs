//! Configuration schema definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use tagsweep_remote::ExecutorConfig;
pub use tagsweep_workqueue::{QueueConfig, TimeoutPolicy};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub bulk: BulkConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// GraphQL endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Value of the `ApiKey` header, if the server requires one.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_endpoint() -> String {
    "http://localhost:9999/graphql".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
        }
    }
}

/// Chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Records per chunk.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    50
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Also write logs to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable text on the console.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
            json: false,
        }
    }
}
