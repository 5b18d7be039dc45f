//! Error types for normalization and ingest
//!
//! Normalization faults are never recovered from inside the library: a record
//! with an unexpected shape aborts the call that was processing it.

use thiserror::Error;

/// Errors raised while normalizing a record
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A field held a value of the wrong JSON kind
    #[error("Malformed field `{field}`: expected {expected}, found {found}")]
    MalformedShape {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A record reached a collection (or a back-reference) without a `wfp_id`
    #[error("Record has no wfp_id: {0}")]
    MissingSurrogateKey(String),
}

impl NormalizeError {
    pub(crate) fn malformed(
        field: impl Into<String>,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        NormalizeError::MalformedShape {
            field: field.into(),
            expected,
            found: kind_of(found),
        }
    }
}

/// Errors raised by the ingest pipeline
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected HTTP status {status} from {url}; no more retries")]
    RetriesExhausted { status: u16, url: String },

    #[error("Error returned from {url}: {message}")]
    Api { url: String, message: String },

    #[error("Couldn't parse the body returned from {url} with HTTP status {status}: {reason}")]
    Parse {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Human readable name of a JSON value's kind, for error messages
pub fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
