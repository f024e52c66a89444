use crate::response::StatusDetails;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed status as returned by the apiserver
///
/// Every non-2xx response carrying a `Status` body decodes into this.
#[derive(Error, Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[error("{message}: {reason}")]
pub struct ErrorResponse {
    /// Either `Failure` or `Success`
    pub status: String,
    /// Human readable description
    #[serde(default)]
    pub message: String,
    /// Machine readable reason, e.g. `NotFound` or `Conflict`
    #[serde(default)]
    pub reason: String,
    /// HTTP status code
    pub code: u16,
    /// Reason specific extra information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl ErrorResponse {
    /// Synthesize a response from a bare HTTP status when the body is not a `Status`
    pub fn from_status_code(code: http::StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: "Failure".into(),
            message: message.into(),
            reason: code.canonical_reason().unwrap_or("Unknown").to_string(),
            code: code.as_u16(),
            details: None,
        }
    }

    /// Whether the apiserver reported the object as missing
    pub fn is_not_found(&self) -> bool {
        self.code == 404 && self.reason == "NotFound"
    }

    /// Whether the write was rejected due to a stale resourceVersion or an existing name
    pub fn is_conflict(&self) -> bool {
        self.code == 409
    }
}
