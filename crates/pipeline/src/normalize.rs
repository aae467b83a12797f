//! Parameter Normalizer.
//!
//! Backends must not receive sentinel "empty" filters (`null`, `""`), which
//! they would otherwise interpret as literal filter values. Normalization
//! walks a [`Payload`] and rebuilds it without them:
//!
//! 1. Scalars are returned unchanged.
//! 2. Raw uploads are returned unchanged and never descended into.
//! 3. Arrays are mapped element-wise (order and length preserved).
//! 4. Mappings keep only keys whose value is not `null` and not `""`; a
//!    surviving [`Payload::Timestamp`] becomes its ISO-8601 string, any other
//!    surviving value is normalized recursively.
//!
//! The result is idempotent: `normalize(&normalize(p)) == normalize(p)`.
//! The input is borrowed and never mutated.

use crate::payload::{iso8601, Payload};

/// Normalizes `value`, treating [`Payload::Binary`] as the only raw upload.
pub fn normalize(value: &Payload) -> Payload {
    normalize_with(value, &Payload::is_binary)
}

/// Normalizes `value` with a caller-supplied raw-upload predicate.
///
/// Any value for which `is_raw` returns `true` is returned as-is.
pub fn normalize_with(value: &Payload, is_raw: &dyn Fn(&Payload) -> bool) -> Payload {
    if !value.is_composite() || is_raw(value) {
        return value.clone();
    }

    match value {
        Payload::Array(items) => Payload::Array(
            items
                .iter()
                .map(|item| normalize_with(item, is_raw))
                .collect(),
        ),
        Payload::Object(map) => Payload::Object(
            map.iter()
                .filter(|(_, v)| !v.is_empty_sentinel())
                .map(|(k, v)| {
                    let cleaned = match v {
                        Payload::Timestamp(t) => Payload::String(iso8601(t)),
                        other => normalize_with(other, is_raw),
                    };
                    (k.clone(), cleaned)
                })
                .collect(),
        ),
        // A binary payload not claimed by `is_raw` is still opaque.
        other => other.clone(),
    }
}
