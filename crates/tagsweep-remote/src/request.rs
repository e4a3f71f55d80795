//! GraphQL request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RemoteError, TransientError};

/// One GraphQL operation as posted to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteRequest {
    pub query: String,
    #[serde(rename = "operationName")]
    pub operation_name: String,
    pub variables: Value,
}

impl RemoteRequest {
    pub fn new(operation_name: impl Into<String>, query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            operation_name: operation_name.into(),
            variables,
        }
    }
}

/// Decoded `data` payload and the record ids the server acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub data: Value,
    pub acknowledged_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Decode a GraphQL response body.
///
/// A non-empty `errors` array is a semantic rejection even when partial data is
/// present.
pub fn parse_response(body: &str) -> Result<RemoteResponse, RemoteError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| TransientError::InvalidResponse(e.to_string()))?;

    if !envelope.errors.is_empty() {
        let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
        return Err(RemoteError::Semantic(messages.join("; ")));
    }

    let data = envelope
        .data
        .ok_or_else(|| TransientError::InvalidResponse("missing data".to_string()))?;
    let acknowledged_ids = collect_ids(&data);

    Ok(RemoteResponse {
        data,
        acknowledged_ids,
    })
}

/// Collect `id` fields from each top-level operation result, which is either a
/// list of records or a single record.
fn collect_ids(data: &Value) -> Vec<String> {
    let Some(fields) = data.as_object() else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    for value in fields.values() {
        match value {
            Value::Array(records) => ids.extend(records.iter().filter_map(record_id)),
            Value::Object(_) => ids.extend(record_id(value)),
            _ => {}
        }
    }
    ids
}

fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
