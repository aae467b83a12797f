//! The classified error taxonomy.
//!
//! Transport failures and business failures are unified under one tagged type,
//! [`ClassifiedError`], so callers pattern-match on [`ErrorKind`] instead of
//! inspecting ad hoc fields. The set of kinds is closed: every failure
//! classifies into exactly one of them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error kinds
// ---------------------------------------------------------------------------

/// The closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// HTTP 401 or business code 401. Invalidates the session.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 500.
    ServerError,
    /// The backend could not be reached.
    NetworkFailure,
    /// The request exceeded the configured timeout.
    Timeout,
    /// An envelope with a failure code, or any failure not covered above.
    BusinessFailure,
}

impl ErrorKind {
    /// Returns `true` if this failure carries session-wide consequences.
    pub fn invalidates_session(self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the snake_case label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::ServerError => "server_error",
            Self::NetworkFailure => "network_failure",
            Self::Timeout => "timeout",
            Self::BusinessFailure => "business_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classified error
// ---------------------------------------------------------------------------

/// A failure that has been mapped onto an [`ErrorKind`].
///
/// Produced by [`crate::classify`] with `handled == false`. The side-effect
/// dispatcher sets `handled` once it has shown a notification for the error,
/// so upstream handlers can tell whether the user has already been told.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    /// Failure category.
    pub kind: ErrorKind,
    /// User-facing message.
    pub message: String,
    /// `true` once a notification has been shown for this error.
    pub handled: bool,
    /// HTTP status of the response, if a response was received.
    pub status: Option<u16>,
    /// Business code from the response envelope, if one was present.
    pub code: Option<i64>,
}

impl ClassifiedError {
    /// Creates an unhandled error with no status or business code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            handled: false,
            status: None,
            code: None,
        }
    }

    /// Returns `true` if this error has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = ClassifiedError::new(ErrorKind::NotFound, "resource not found");
        assert_eq!(err.to_string(), "not_found: resource not found");
        assert!(!err.handled);
    }

    #[test]
    fn only_unauthorized_invalidates_session() {
        assert!(ErrorKind::Unauthorized.invalidates_session());
        assert!(!ErrorKind::Forbidden.invalidates_session());
        assert!(!ErrorKind::BusinessFailure.invalidates_session());
    }

    #[test]
    fn kind_serialises_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NetworkFailure).unwrap(),
            "\"network_failure\""
        );
    }
}
