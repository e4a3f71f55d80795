//! Remote execution errors.

use std::time::Duration;

use thiserror::Error;

/// Failures that may succeed when the same request is sent again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransientError {
    /// Connection or protocol failure before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The request did not complete within the request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors returned by [`RemoteExecutor::execute`](crate::RemoteExecutor::execute).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Retryable failure.
    #[error("Transient failure: {0}")]
    Transient(#[from] TransientError),

    /// The endpoint accepted the request but reported it invalid.
    #[error("Rejected by server: {0}")]
    Semantic(String),

    /// The caller's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, RemoteError::Semantic(_))
    }

    pub fn network(message: impl Into<String>) -> Self {
        TransientError::Network(message.into()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RemoteError::network("reset").is_transient());
        assert!(RemoteError::from(TransientError::Timeout(Duration::from_secs(1))).is_transient());
        assert!(RemoteError::Semantic("unknown tag".to_string()).is_semantic());
        assert!(!RemoteError::Cancelled.is_transient());
        assert!(!RemoteError::Cancelled.is_semantic());
    }

    #[test]
    fn test_display() {
        let err = RemoteError::from(TransientError::Http {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Transient failure: HTTP error: 502 - bad gateway"
        );
    }
}
