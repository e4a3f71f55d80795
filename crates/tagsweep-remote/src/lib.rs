//! Remote mutation execution for tagsweep.
//!
//! A [`RemoteExecutor`] sends one mutation through a [`Transport`], bounding each
//! call with a request timeout and retrying transient failures with exponential
//! backoff. Semantic rejections are surfaced immediately.

pub mod config;
pub mod error;
pub mod executor;
pub mod request;
pub mod transport;

pub use config::ExecutorConfig;
pub use error::{RemoteError, TransientError};
pub use executor::RemoteExecutor;
pub use request::{RemoteRequest, RemoteResponse};
pub use transport::{HttpTransport, Transport};

pub use tokio_util::sync::CancellationToken;
