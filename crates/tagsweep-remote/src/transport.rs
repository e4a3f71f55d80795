//! Wire transport for remote requests.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{RemoteError, TransientError};
use crate::request::{RemoteRequest, RemoteResponse, parse_response};

/// Sends a single request and classifies the outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError>;
}

/// GraphQL over HTTP POST.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Send the key in the `ApiKey` header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        debug!("POST {} ({})", self.endpoint, request.operation_name);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("ApiKey", key);
        }

        let response = builder
            .json(request)
            .send()
            .await
            .map_err(|e| TransientError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransientError::Http { status, message }.into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransientError::Network(e.to_string()))?;
        parse_response(&body)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
