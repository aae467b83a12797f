//! Credential Injector.
//!
//! Reads the current [`Session`] and turns it into identity headers. Absence of
//! a token or user id is a valid, silent state: the corresponding header is
//! simply not sent, never sent empty.

use pipeline::Session;

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Header carrying the signed-in user's id.
pub const USER_ID_HEADER: &str = "X-User-ID";

/// Returns the identity headers for `session`.
pub fn credential_headers(session: &Session) -> Vec<(String, String)> {
    let mut headers = Vec::with_capacity(2);
    if let Some(token) = session.token.as_deref().filter(|t| !t.is_empty()) {
        headers.push((AUTHORIZATION_HEADER.to_owned(), format!("Bearer {token}")));
    }
    if let Some(user_id) = session.user_id.as_deref().filter(|u| !u.is_empty()) {
        headers.push((USER_ID_HEADER.to_owned(), user_id.to_owned()));
    }
    headers
}

/// Sets `name` to `value`, replacing any existing header of the same name
/// (case-insensitive).
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    headers.push((name.to_owned(), value));
}
