//! Status responses returned for deletes and failures
use serde::{Deserialize, Serialize};

/// The apiserver's `Status` object
///
/// Returned in place of an object by delete calls that do not hand back the deleted object,
/// and as the body of every failed call.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Status {
    /// `Success` or `Failure`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSummary>,

    /// Suggested HTTP return code, 0 when unset
    #[serde(default, skip_serializing_if = "is_zero")]
    pub code: u16,

    /// Human readable description of the outcome
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Machine readable cause of a `Failure`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Reason specific extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl Status {
    fn summarized(summary: StatusSummary) -> Self {
        Self {
            status: Some(summary),
            ..Self::default()
        }
    }

    /// A `Success` status
    pub fn success() -> Self {
        Self::summarized(StatusSummary::Success)
    }

    /// A `Failure` status with a message and reason
    pub fn failure(message: &str, reason: &str) -> Self {
        Self {
            message: message.into(),
            reason: reason.into(),
            ..Self::summarized(StatusSummary::Failure)
        }
    }

    /// Set the HTTP code
    #[must_use]
    pub fn with_code(self, code: u16) -> Self {
        Self { code, ..self }
    }

    /// Attach details
    #[must_use]
    pub fn with_details(self, details: StatusDetails) -> Self {
        Self {
            details: Some(details),
            ..self
        }
    }

    /// `status` is `Success`
    ///
    /// Without a summary a status is neither success nor failure.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(StatusSummary::Success))
    }

    /// `status` is `Failure`
    pub fn is_failure(&self) -> bool {
        matches!(self.status, Some(StatusSummary::Failure))
    }
}

/// Outcome summary of a [`Status`]
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatusSummary {
    /// The operation went through
    Success,
    /// The operation was rejected or failed
    Failure,
}

/// Extra data on a [`Status`]
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    /// Name of the affected object, if a single one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// API group of the affected object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    /// Kind (or plural) of the affected object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// UID of the affected object, if a single one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Individual causes, typically one per invalid field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,

    /// Seconds to wait before a retry may succeed
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_after_seconds: u32,
}

/// One cause inside [`StatusDetails`]
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct StatusCause {
    /// Machine readable cause
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Human readable cause
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// JSON path of the offending field, e.g. `spec.class.name`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

fn is_zero<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}
