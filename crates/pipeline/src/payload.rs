//! The outgoing value model.
//!
//! [`Payload`] is what callers hand to the pipeline as a query or body. It is
//! a superset of JSON: it additionally distinguishes date/time instances
//! ([`Payload::Timestamp`]) and raw multipart uploads ([`Payload::Binary`]),
//! because the Parameter Normalizer treats both specially.
//!
//! JSON `null` stands in for both "null" and "absent"; Rust has no separate
//! `undefined`, and an `Option::None` field serialises to `null`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

// ---------------------------------------------------------------------------
// Multipart uploads
// ---------------------------------------------------------------------------

/// Content of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    /// A plain text field.
    Text(String),
    /// A file field.
    File {
        /// File name reported to the server, if any.
        file_name: Option<String>,
        /// MIME type of the file, if known (e.g. `"image/png"`).
        mime: Option<String>,
        /// Raw file contents.
        bytes: Vec<u8>,
    },
}

/// One named part of a [`MultipartForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Form field name.
    pub name: String,
    /// Field content.
    pub content: PartContent,
}

/// A raw binary/multipart upload.
///
/// The normalizer never descends into a form, and the transport sends it as
/// `multipart/form-data` with a boundary of its own choosing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            content: PartContent::Text(value.into()),
        });
        self
    }

    /// Appends a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            content: PartContent::File {
                file_name: Some(file_name.into()),
                mime: mime.map(str::to_owned),
                bytes,
            },
        });
        self
    }

    /// Returns the parts in insertion order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// An outgoing query or body value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON `null`; also represents an absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A string.
    String(String),
    /// A date/time instance. Serialises as its ISO-8601 string.
    Timestamp(DateTime<Utc>),
    /// An ordered sequence.
    Array(Vec<Payload>),
    /// A keyed mapping.
    Object(BTreeMap<String, Payload>),
    /// A raw multipart upload; opaque to normalization.
    Binary(MultipartForm),
}

impl Payload {
    /// Builds a payload from any serialisable value.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be represented as JSON
    /// (e.g. a map with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// Creates an empty keyed mapping.
    pub fn object() -> Self {
        Self::Object(BTreeMap::new())
    }

    /// Inserts `key` into a keyed mapping; a no-op on any other variant.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Payload>) -> Self {
        if let Self::Object(map) = &mut self {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Returns `true` for arrays, mappings, and binary uploads.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_) | Self::Binary(_))
    }

    /// Returns `true` for a raw multipart upload.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Returns `true` for values that a keyed mapping must not carry: `null`
    /// (including absent) and the empty string. `0` and `false` are real values.
    pub fn is_empty_sentinel(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Looks up `key` in a keyed mapping.
    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Flattens a top-level mapping into query-string pairs.
    ///
    /// Scalars use their string form, arrays become repeated keys, and nested
    /// mappings are sent as compact JSON. Non-mapping payloads, `null` entries,
    /// and binary entries produce no pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let Self::Object(map) = self else {
            return Vec::new();
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Self::Array(items) => {
                    pairs.extend(
                        items
                            .iter()
                            .filter_map(query_text)
                            .map(|text| (key.clone(), text)),
                    );
                }
                other => {
                    if let Some(text) = query_text(other) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
        }
        pairs
    }
}

/// Formats a date/time as ISO-8601 in UTC with a `Z` suffix.
///
/// Sub-second precision is kept, so the string parses back to the same instant.
pub fn iso8601(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn query_text(value: &Payload) -> Option<String> {
    match value {
        Payload::Null | Payload::Binary(_) => None,
        Payload::Bool(b) => Some(b.to_string()),
        Payload::Number(n) => Some(n.to_string()),
        Payload::String(s) => Some(s.clone()),
        Payload::Timestamp(t) => Some(iso8601(t)),
        Payload::Array(_) | Payload::Object(_) => serde_json::to_string(value).ok(),
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<DateTime<Utc>> for Payload {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Timestamp(instant)
    }
}

impl From<MultipartForm> for Payload {
    fn from(form: MultipartForm) -> Self {
        Self::Binary(form)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Timestamp(t) => serializer.serialize_str(&iso8601(t)),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Self::Binary(_) => Err(S::Error::custom(
                "multipart payloads cannot be serialised as JSON",
            )),
        }
    }
}
