//! Envelope Unwrapper.
//!
//! Backends wrap every response as `{ "code": number, "msg": string, "data": any }`.
//! `code` `0` or `200` marks success; anything else is a failure. A body that
//! does not carry a numeric `code` is not enveloped (e.g. a file download) and
//! is passed through untouched.

use serde_json::Value;

use crate::classify::FailureReport;
use crate::{Reply, TransportResponse};

/// Business codes that mark success.
pub const SUCCESS_CODES: [i64; 2] = [0, 200];

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Business code. `None` when the code is numeric but not an integer,
    /// which is never a success marker.
    pub code: Option<i64>,
    /// Human-readable message; `None` when missing or empty.
    pub msg: Option<String>,
    /// Payload; `null` when absent.
    pub data: Value,
}

impl Envelope {
    /// Decodes `body` as an envelope.
    ///
    /// Returns `None` if the body is empty, not JSON, not an object, or its
    /// `code` field is missing or not numeric.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let Value::Object(mut map) = serde_json::from_slice::<Value>(body).ok()? else {
            return None;
        };
        let code = match map.get("code") {
            Some(Value::Number(n)) => n.as_i64(),
            _ => return None,
        };
        let msg = map
            .get("msg")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);
        let data = map.remove("data").unwrap_or(Value::Null);
        Some(Self { code, msg, data })
    }

    /// Returns `true` if the business code marks success.
    pub fn is_success(&self) -> bool {
        self.code.is_some_and(|c| SUCCESS_CODES.contains(&c))
    }
}

/// Unwraps a transport response.
///
/// - Non-2xx responses are failures; any envelope in the body contributes its
///   `code` and `msg` to the report.
/// - 2xx responses without an envelope are returned as [`Reply::Raw`].
/// - 2xx envelopes with a success code resolve to [`Reply::Data`].
/// - 2xx envelopes with any other code are business failures.
///
/// # Errors
///
/// Returns a [`FailureReport`] for the classifier when the response is a failure.
pub fn unwrap_response(response: TransportResponse) -> Result<Reply, FailureReport> {
    let envelope = Envelope::parse(&response.body);

    if !response.is_success() {
        let (code, msg) = envelope.map_or((None, None), |e| (e.code, e.msg));
        return Err(FailureReport {
            status: Some(response.status),
            code,
            msg,
            transport: None,
        });
    }

    match envelope {
        None => Ok(Reply::Raw(response)),
        Some(envelope) if envelope.is_success() => Ok(Reply::Data(envelope.data)),
        Some(envelope) => Err(FailureReport {
            status: Some(response.status),
            code: envelope.code,
            msg: envelope.msg,
            transport: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(status: u16, body: &str) -> TransportResponse {
        TransportResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn success_codes_unwrap_data() {
        for code in SUCCESS_CODES {
            let body = format!(r#"{{"code":{code},"msg":"ok","data":{{"id":"x"}}}}"#);
            assert_eq!(
                unwrap_response(response(200, &body)).unwrap(),
                Reply::Data(json!({"id": "x"}))
            );
        }
    }

    #[test]
    fn missing_data_unwraps_to_null() {
        assert_eq!(
            unwrap_response(response(200, r#"{"code":0}"#)).unwrap(),
            Reply::Data(Value::Null)
        );
    }

    #[test]
    fn non_numeric_code_passes_through_raw() {
        for body in [r#"{"code":"0","data":1}"#, r#"{"data":1}"#, "[1,2]", "not json", ""] {
            let raw = response(200, body);
            assert_eq!(unwrap_response(raw.clone()).unwrap(), Reply::Raw(raw));
        }
    }

    #[test]
    fn failure_code_reports_message() {
        let report = unwrap_response(response(200, r#"{"code":1001,"msg":"title taken"}"#))
            .unwrap_err();
        assert_eq!(report.code, Some(1001));
        assert_eq!(report.msg.as_deref(), Some("title taken"));
        assert_eq!(report.status, Some(200));
    }

    #[test]
    fn fractional_code_is_a_failure() {
        let report = unwrap_response(response(200, r#"{"code":200.5}"#)).unwrap_err();
        assert_eq!(report.code, None);
    }

    #[test]
    fn error_status_carries_envelope_fields() {
        let report =
            unwrap_response(response(400, r#"{"code":400,"msg":"bad filter"}"#)).unwrap_err();
        assert_eq!(report.status, Some(400));
        assert_eq!(report.msg.as_deref(), Some("bad filter"));

        let report = unwrap_response(response(502, "<html>")).unwrap_err();
        assert_eq!(report.code, None);
        assert_eq!(report.msg, None);
    }

    #[test]
    fn empty_msg_is_treated_as_missing() {
        let envelope = Envelope::parse(br#"{"code":5,"msg":""}"#).unwrap();
        assert_eq!(envelope.msg, None);
    }
}
