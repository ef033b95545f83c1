// src/error.rs
//! Normalized error raised at the remote-call boundary.
//!
//! The API reports failures in several shapes (`{"error": ..}`, `{"detail": ..}`,
//! field maps, bare strings, HTML error pages). They are all folded into a single
//! [`ApiError`] here so callers never look at raw payloads.

use serde_json::Value;
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed, please try again.";

/// Keys probed, in order, before falling back to the first key of the object.
const MESSAGE_KEYS: [&str; 4] = ["error", "detail", "message", "non_field_errors"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Unauthorized,
    Validation,
    NotFound,
    Server,
    Decode,
    /// Rejected locally before any request was sent.
    Precondition,
    /// Another transition for the same application is still in flight.
    Busy,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Precondition, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Busy, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unauthorized,
            message: message.into(),
            status: Some(401),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Build from a non-success HTTP status and its raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            400..=499 => ErrorKind::Validation,
            _ => ErrorKind::Server,
        };

        Self {
            kind,
            message: extract_message(body).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            status: Some(status),
        }
    }

    /// True when the failure happened before anything reached the server.
    pub fn is_local(&self) -> bool {
        matches!(self.kind, ErrorKind::Precondition | ErrorKind::Busy)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::decode(format!("Unexpected response from server: {}", err));
        }

        let mut error = ApiError::new(
            ErrorKind::Network,
            "Network error, check your connection and try again.",
        );
        error.status = err.status().map(|s| s.as_u16());
        error
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::decode(format!("Unexpected response from server: {}", err))
    }
}

/// Pull a displayable message out of an error body, if it has one.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => message_from_value(&value),
        Err(_) if trimmed.starts_with('<') => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(message_from_value),
        Value::Object(map) => MESSAGE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(message_from_value)
            .or_else(|| map.values().next().and_then(message_from_value)),
        _ => None,
    }
}
