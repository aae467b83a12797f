//! Shared value types that flow between pipeline stages and across the port
//! boundary.
//!
//! [`OutgoingRequest`] is what the orchestration layer hands to a
//! [`crate::Transport`]; [`TransportResponse`] and [`TransportFailure`] are
//! what comes back. [`Reply`] is the outcome of envelope unwrapping.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Payload;

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

/// The four verbs exposed by every service client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-call options
// ---------------------------------------------------------------------------

/// Per-call configuration.
///
/// `skip_error_handler` suppresses the global notification for this call. It
/// never suppresses the rejection: a caller that opts out must surface the
/// failure itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Suppress the notification side effect.
    pub skip_error_handler: bool,
    /// Query parameters; normalized before being flattened into the URL.
    pub query: Option<Payload>,
    /// Extra headers for this call. Credential headers are applied after
    /// these and take precedence.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Returns options that suppress the notification side effect.
    #[must_use]
    pub fn skip_error_handler(mut self) -> Self {
        self.skip_error_handler = true;
        self
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<Payload>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Adds an extra header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The identity attached to outgoing requests.
///
/// Held by a [`crate::CredentialStore`]. Either half may be absent; absence is
/// a valid state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token.
    pub token: Option<String>,
    /// Identifier of the signed-in user.
    pub user_id: Option<String>,
}

impl Session {
    /// Creates a session from a token and an optional user id.
    pub fn new(token: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            token: Some(token.into()),
            user_id,
        }
    }

    /// Returns `true` if neither a token nor a user id is present.
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Transport boundary
// ---------------------------------------------------------------------------

/// A fully prepared request, ready for a [`crate::Transport`].
///
/// The query and body have already been normalized and the credential headers
/// attached. `url` is absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Absolute URL (base address joined with the call path).
    pub url: String,
    /// Header name/value pairs, in application order.
    pub headers: Vec<(String, String)>,
    /// Query-string pairs.
    pub query: Vec<(String, String)>,
    /// Body; `None` for bodiless requests.
    pub body: Option<Payload>,
    /// Timeout shared by every call to this service.
    pub timeout: Duration,
}

impl OutgoingRequest {
    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received by the transport, before envelope unwrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the transport observed when no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportSignal {
    /// The backend was unreachable (DNS, refused connection, reset).
    Network,
    /// The request timed out.
    Timeout,
}

/// A transport-level failure: no usable response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Explicit signal, when the transport could determine one.
    pub signal: Option<TransportSignal>,
    /// Transport diagnostic message.
    pub message: String,
}

impl TransportFailure {
    /// Creates a failure with an explicit signal.
    pub fn new(signal: Option<TransportSignal>, message: impl Into<String>) -> Self {
        Self {
            signal,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// The successful outcome of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// An envelope with a success code; holds its `data` (`null` if absent).
    Data(serde_json::Value),
    /// A response that is not enveloped (e.g. a binary download), unchanged.
    Raw(TransportResponse),
}

/// Why a [`Reply`] could not be turned into the caller's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMismatch {
    /// Enveloped `data` does not have the expected shape.
    Data,
    /// A non-enveloped body is not JSON of the expected shape.
    Raw {
        /// HTTP status of the raw response.
        status: u16,
    },
}

/// Conversion from a successful [`Reply`] into the value a typed verb returns.
///
/// Every deserializable type decodes the envelope `data` (or a raw JSON
/// body). [`Reply`] itself is returned unchanged, so a non-enveloped download
/// reaches the caller untouched.
pub trait FromReply: Sized {
    /// Converts `reply`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReplyMismatch`] if the reply does not fit `Self`.
    fn from_reply(reply: Reply) -> Result<Self, ReplyMismatch>;
}

impl<T: DeserializeOwned> FromReply for T {
    fn from_reply(reply: Reply) -> Result<Self, ReplyMismatch> {
        match reply {
            Reply::Data(value) => serde_json::from_value(value).map_err(|_| ReplyMismatch::Data),
            Reply::Raw(response) => serde_json::from_slice(&response.body).map_err(|_| {
                ReplyMismatch::Raw {
                    status: response.status,
                }
            }),
        }
    }
}

impl FromReply for Reply {
    fn from_reply(reply: Reply) -> Result<Self, ReplyMismatch> {
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder_accumulates() {
        let options = RequestOptions::default()
            .skip_error_handler()
            .with_header("X-Trace", "1")
            .with_query(Payload::object().with("page", 1));
        assert!(options.skip_error_handler);
        assert_eq!(options.headers, vec![("X-Trace".to_owned(), "1".to_owned())]);
        assert!(options.query.is_some());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = TransportResponse {
            status: 200,
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: Vec::new(),
        };
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
    }

    #[test]
    fn reply_converts_to_itself_or_decodes() {
        let raw = Reply::Raw(TransportResponse {
            status: 200,
            headers: Vec::new(),
            body: b"%PDF-1.7".to_vec(),
        });
        assert_eq!(Reply::from_reply(raw.clone()), Ok(raw.clone()));
        assert_eq!(
            serde_json::Value::from_reply(raw),
            Err(ReplyMismatch::Raw { status: 200 })
        );

        let data = Reply::Data(serde_json::json!([1, 2]));
        assert_eq!(Vec::<u32>::from_reply(data.clone()), Ok(vec![1, 2]));
        assert_eq!(String::from_reply(data), Err(ReplyMismatch::Data));
    }

    #[test]
    fn default_session_is_empty() {
        assert!(Session::default().is_empty());
        assert!(!Session::new("t", None).is_empty());
    }
}
