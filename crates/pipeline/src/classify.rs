//! Error Classifier.
//!
//! A pure mapping from a raw failure to a [`ClassifiedError`]. Two entry
//! points feed it: an envelope carrying a failure code (see
//! [`crate::envelope::unwrap_response`]) and a transport failure where no
//! response was received. Both are expressed as a [`FailureReport`].
//!
//! Rules, first match wins:
//!
//! | # | Condition | Kind |
//! |---|-----------|------|
//! | 1 | network-unreachable signal | [`ErrorKind::NetworkFailure`] |
//! | 2 | timeout signal | [`ErrorKind::Timeout`] |
//! | 3 | status 401 or business code 401 | [`ErrorKind::Unauthorized`] |
//! | 4 | status 403 | [`ErrorKind::Forbidden`] |
//! | 5 | status 404 | [`ErrorKind::NotFound`] |
//! | 6 | status 500 | [`ErrorKind::ServerError`] |
//! | 7 | anything else | [`ErrorKind::BusinessFailure`] |

use crate::{ClassifiedError, ErrorKind, TransportFailure, TransportSignal};

/// Message for [`ErrorKind::NetworkFailure`].
pub const NETWORK_MESSAGE: &str = "network error, check connectivity";
/// Message for [`ErrorKind::Timeout`].
pub const TIMEOUT_MESSAGE: &str = "request timed out, please retry";
/// Fallback message for [`ErrorKind::Unauthorized`] when the envelope has none.
pub const UNAUTHORIZED_MESSAGE: &str = "session expired, please sign in again";
/// Message for [`ErrorKind::Forbidden`].
pub const FORBIDDEN_MESSAGE: &str = "access denied";
/// Message for [`ErrorKind::NotFound`].
pub const NOT_FOUND_MESSAGE: &str = "resource not found";
/// Message for [`ErrorKind::ServerError`].
pub const SERVER_ERROR_MESSAGE: &str = "internal server error";
/// Fallback message for [`ErrorKind::BusinessFailure`].
pub const GENERIC_MESSAGE: &str = "request failed";
/// Message for a response that cannot be decoded into the caller's type.
pub const UNDECODABLE_MESSAGE: &str = "unexpected response format";

const UNAUTHORIZED_CODE: i64 = 401;

// Lower-cased fragments that identify a failure when the transport could not
// supply an explicit signal.
const NETWORK_PHRASES: [&str; 5] = [
    "network error",
    "network is unreachable",
    "connection refused",
    "connection reset",
    "dns error",
];
const TIMEOUT_PHRASES: [&str; 2] = ["timeout", "timed out"];

/// Everything known about a failed call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Business code from the envelope, if present and integral.
    pub code: Option<i64>,
    /// Envelope message, if present and non-empty.
    pub msg: Option<String>,
    /// Transport failure, if no usable response was received.
    pub transport: Option<TransportFailure>,
}

impl FailureReport {
    /// A report for a call that received no response.
    pub fn transport(failure: TransportFailure) -> Self {
        Self {
            transport: Some(failure),
            ..Self::default()
        }
    }

    /// A report for a response that could not be decoded into the caller's type.
    pub fn undecodable(status: Option<u16>) -> Self {
        Self {
            status,
            msg: Some(UNDECODABLE_MESSAGE.to_owned()),
            ..Self::default()
        }
    }

    fn signal(&self) -> Option<TransportSignal> {
        let failure = self.transport.as_ref()?;
        if failure.signal.is_some() {
            return failure.signal;
        }
        let message = failure.message.to_ascii_lowercase();
        if NETWORK_PHRASES.iter().any(|p| message.contains(p)) {
            Some(TransportSignal::Network)
        } else if TIMEOUT_PHRASES.iter().any(|p| message.contains(p)) {
            Some(TransportSignal::Timeout)
        } else {
            None
        }
    }
}

/// Classifies a failure. The result always has `handled == false`.
///
/// An explicit [`TransportSignal`] takes precedence over message matching.
pub fn classify(report: &FailureReport) -> ClassifiedError {
    let (kind, message) = match (report.signal(), report.status, report.code) {
        (Some(TransportSignal::Network), _, _) => {
            (ErrorKind::NetworkFailure, NETWORK_MESSAGE.to_owned())
        }
        (Some(TransportSignal::Timeout), _, _) => (ErrorKind::Timeout, TIMEOUT_MESSAGE.to_owned()),
        (None, Some(401), _) | (None, _, Some(UNAUTHORIZED_CODE)) => (
            ErrorKind::Unauthorized,
            report.msg.clone().unwrap_or_else(|| UNAUTHORIZED_MESSAGE.to_owned()),
        ),
        (None, Some(403), _) => (ErrorKind::Forbidden, FORBIDDEN_MESSAGE.to_owned()),
        (None, Some(404), _) => (ErrorKind::NotFound, NOT_FOUND_MESSAGE.to_owned()),
        (None, Some(500), _) => (ErrorKind::ServerError, SERVER_ERROR_MESSAGE.to_owned()),
        (None, _, _) => (
            ErrorKind::BusinessFailure,
            report.msg.clone().unwrap_or_else(|| GENERIC_MESSAGE.to_owned()),
        ),
    };

    ClassifiedError {
        kind,
        message,
        handled: false,
        status: report.status,
        code: report.code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> FailureReport {
        FailureReport {
            status: Some(status),
            ..FailureReport::default()
        }
    }

    fn transport(signal: Option<TransportSignal>, message: &str) -> FailureReport {
        FailureReport::transport(TransportFailure::new(signal, message))
    }

    #[test]
    fn explicit_signals_win() {
        assert_eq!(
            classify(&transport(Some(TransportSignal::Timeout), "network error")).kind,
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&transport(Some(TransportSignal::Network), "")).message,
            NETWORK_MESSAGE
        );
    }

    #[test]
    fn message_phrases_are_recognised() {
        assert_eq!(
            classify(&transport(None, "Network Error")).kind,
            ErrorKind::NetworkFailure
        );
        assert_eq!(
            classify(&transport(None, "timeout of 10000ms exceeded")).kind,
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&transport(None, "body stream closed")).kind,
            ErrorKind::BusinessFailure
        );
    }

    #[test]
    fn network_phrase_outranks_timeout_phrase() {
        assert_eq!(
            classify(&transport(None, "network error after timeout")).kind,
            ErrorKind::NetworkFailure
        );
    }

    #[test]
    fn statuses_map_to_fixed_messages() {
        let cases = [
            (403, ErrorKind::Forbidden, FORBIDDEN_MESSAGE),
            (404, ErrorKind::NotFound, NOT_FOUND_MESSAGE),
            (500, ErrorKind::ServerError, SERVER_ERROR_MESSAGE),
        ];
        for (code, kind, message) in cases {
            let err = classify(&status(code));
            assert_eq!(err.kind, kind);
            assert_eq!(err.message, message);
            assert_eq!(err.status, Some(code));
            assert!(!err.handled);
        }
    }

    #[test]
    fn unauthorized_from_status_or_business_code() {
        assert_eq!(classify(&status(401)).kind, ErrorKind::Unauthorized);
        assert_eq!(classify(&status(401)).message, UNAUTHORIZED_MESSAGE);

        let report = FailureReport {
            status: Some(200),
            code: Some(401),
            msg: Some("expired".to_owned()),
            transport: None,
        };
        let err = classify(&report);
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "expired");
        assert_eq!(err.code, Some(401));
    }

    #[test]
    fn business_failure_uses_envelope_message() {
        let report = FailureReport {
            status: Some(200),
            code: Some(403),
            msg: Some("quota reached".to_owned()),
            transport: None,
        };
        let err = classify(&report);
        assert_eq!(err.kind, ErrorKind::BusinessFailure);
        assert_eq!(err.message, "quota reached");
    }

    #[test]
    fn business_failure_falls_back_to_generic_message() {
        let err = classify(&status(418));
        assert_eq!(err.kind, ErrorKind::BusinessFailure);
        assert_eq!(err.message, GENERIC_MESSAGE);
    }
}
