//! Error types for the BBJ client.
//!
//! # Design
//! The service reports business failures as `{"error": {"code", "description"}}`.
//! Every business variant carries the full `ErrorRecord` so callers can reach
//! the code, the description and the raw error object without downcasting.
//! Transport and protocol faults are separate variants and are raised before
//! the classifier ever sees a response.

use serde_json::Value;
use thiserror::Error;

/// A business error as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub code: i64,
    pub description: String,
    /// The complete error object as received.
    pub body: Value,
}

/// Errors returned by `BbjClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Codes 0, 1 and 2 (internal server, HTTP and JSON faults), and any code
    /// the client does not recognize.
    #[error("internal server fault (code {}): {}", .0.code, .0.description)]
    Internal(ErrorRecord),

    /// Code 3: the request parameters were malformed or illegal.
    #[error("invalid argument (code {}): {}", .0.code, .0.description)]
    InvalidArgument(ErrorRecord),

    /// Code 4: a user-supplied value breaks a domain rule. Show these to users.
    #[error("{}", .0.description)]
    PolicyViolation(ErrorRecord),

    /// Code 5: the credentials were rejected.
    #[error("authorization denied: {}", .0.description)]
    AuthorizationDenied(ErrorRecord),

    /// A `validate` call rejected a value and the caller asked for the
    /// default failure kind.
    #[error("validation failed: {}", .0.description)]
    ValidationFailed(ErrorRecord),

    /// The host could not be reached at all.
    #[error("cannot connect to {url} (is the server down?): {reason}")]
    Unreachable { url: String, reason: String },

    /// The response body was not the JSON the protocol requires.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The request parameters could not be encoded as a JSON object.
    #[error("could not encode request: {0}")]
    Serialization(String),

    /// The server echoed back something other than what was sent.
    #[error("server response does not match request: {0}")]
    IntegrityMismatch(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// The business error kinds a caller can ask a validation failure to raise as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Internal,
    InvalidArgument,
    PolicyViolation,
    AuthorizationDenied,
    ValidationFailed,
}

impl ErrorKind {
    /// The protocol code used when the client synthesizes an error of this kind.
    pub fn code(self) -> i64 {
        match self {
            ErrorKind::Internal => 0,
            ErrorKind::InvalidArgument => 3,
            ErrorKind::PolicyViolation | ErrorKind::ValidationFailed => 4,
            ErrorKind::AuthorizationDenied => 5,
        }
    }

    /// Wrap `record` in the variant for this kind.
    pub fn into_error(self, record: ErrorRecord) -> ApiError {
        match self {
            ErrorKind::Internal => ApiError::Internal(record),
            ErrorKind::InvalidArgument => ApiError::InvalidArgument(record),
            ErrorKind::PolicyViolation => ApiError::PolicyViolation(record),
            ErrorKind::AuthorizationDenied => ApiError::AuthorizationDenied(record),
            ErrorKind::ValidationFailed => ApiError::ValidationFailed(record),
        }
    }
}

impl ApiError {
    /// The business kind, or `None` for transport, protocol and config faults.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Internal(_) => Some(ErrorKind::Internal),
            ApiError::InvalidArgument(_) => Some(ErrorKind::InvalidArgument),
            ApiError::PolicyViolation(_) => Some(ErrorKind::PolicyViolation),
            ApiError::AuthorizationDenied(_) => Some(ErrorKind::AuthorizationDenied),
            ApiError::ValidationFailed(_) => Some(ErrorKind::ValidationFailed),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            ApiError::Internal(r)
            | ApiError::InvalidArgument(r)
            | ApiError::PolicyViolation(r)
            | ApiError::AuthorizationDenied(r)
            | ApiError::ValidationFailed(r) => Some(r),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        self.record().map(|r| r.code)
    }

    pub fn description(&self) -> Option<&str> {
        self.record().map(|r| r.description.as_str())
    }

    pub fn body(&self) -> Option<&Value> {
        self.record().map(|r| &r.body)
    }
}

/// Map a service error record to its error variant.
///
/// The mapping is fixed by the protocol. Unknown codes are kept as
/// `Internal` with the original code preserved.
pub fn classify(record: ErrorRecord) -> ApiError {
    match record.code {
        0..=2 => ApiError::Internal(record),
        3 => ApiError::InvalidArgument(record),
        4 => ApiError::PolicyViolation(record),
        5 => ApiError::AuthorizationDenied(record),
        code => {
            tracing::warn!(target: "bbj_core::error", code, "unrecognized error code, treating as internal");
            ApiError::Internal(record)
        }
    }
}

/// Pull `code` and `description` out of a raw error object.
///
/// An object without an integer `code` is a protocol violation. A missing
/// description is tolerated as an empty string.
pub(crate) fn record_from_error_object(error: &Value) -> Result<ErrorRecord, ApiError> {
    let code = error
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::Decode(format!("error object without integer code: {error}")))?;
    let description = error
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(ErrorRecord {
        code,
        description,
        body: error.clone(),
    })
}
