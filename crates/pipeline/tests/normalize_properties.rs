//! Property-based tests for the Parameter Normalizer.
//!
//! These tests verify universal properties across generated payloads using proptest.

use chrono::{DateTime, TimeZone, Utc};
use pipeline::{iso8601, normalize, MultipartForm, Payload};
use proptest::prelude::*;

fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    // 1970..2100, with nanosecond precision.
    (0i64..4_102_444_800, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

fn arb_scalar() -> impl Strategy<Value = Payload> {
    prop_oneof![
        Just(Payload::Null),
        any::<bool>().prop_map(Payload::Bool),
        any::<i64>().prop_map(Payload::from),
        Just(Payload::String(String::new())),
        "[a-z]{1,8}".prop_map(Payload::String),
        arb_timestamp().prop_map(Payload::Timestamp),
        arb_binary(),
    ]
}

/// A multipart upload whose text fields are often empty, so descending into
/// it would be observable.
fn arb_binary() -> impl Strategy<Value = Payload> {
    (
        prop::collection::vec(("[a-c]{1,3}", prop_oneof![Just(String::new()), "[a-z]{1,4}"]), 0..4),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
    )
        .prop_map(|(fields, file)| {
            let form = fields
                .into_iter()
                .fold(MultipartForm::new(), |form, (name, value)| form.text(name, value));
            let form = match file {
                Some(bytes) => form.file("upload", "a.bin", None, bytes),
                None => form,
            };
            Payload::Binary(form)
        })
}

fn arb_payload() -> impl Strategy<Value = Payload> {
    arb_scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Payload::Array),
            prop::collection::btree_map("[a-e]{1,3}", inner, 0..6).prop_map(Payload::Object),
        ]
    })
}

/// Returns `true` if any mapping, at any depth, carries a `null` or `""` value.
fn has_sentinel_key(payload: &Payload) -> bool {
    match payload {
        Payload::Object(map) => map
            .values()
            .any(|v| v.is_empty_sentinel() || has_sentinel_key(v)),
        Payload::Array(items) => items.iter().any(has_sentinel_key),
        _ => false,
    }
}

/// Returns `true` if any mapping, at any depth, still holds a timestamp.
fn has_timestamp_in_mapping(payload: &Payload) -> bool {
    match payload {
        Payload::Object(map) => map
            .values()
            .any(|v| matches!(v, Payload::Timestamp(_)) || has_timestamp_in_mapping(v)),
        Payload::Array(items) => items.iter().any(has_timestamp_in_mapping),
        _ => false,
    }
}

/// Collects every upload in traversal order.
fn binaries(payload: &Payload, out: &mut Vec<MultipartForm>) {
    match payload {
        Payload::Binary(form) => out.push(form.clone()),
        Payload::Array(items) => items.iter().for_each(|v| binaries(v, out)),
        Payload::Object(map) => map.values().for_each(|v| binaries(v, out)),
        _ => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_normalize_is_idempotent(payload in arb_payload()) {
        let once = normalize(&payload);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn prop_sentinel_keys_removed_at_every_depth(payload in arb_payload()) {
        prop_assert!(!has_sentinel_key(&normalize(&payload)));
    }

    #[test]
    fn prop_mapping_timestamps_become_strings(payload in arb_payload()) {
        prop_assert!(!has_timestamp_in_mapping(&normalize(&payload)));
    }

    #[test]
    fn prop_zero_and_false_are_preserved(key in "[a-z]{1,5}") {
        let input = Payload::object()
            .with(key.clone(), 0)
            .with(format!("{key}_flag"), false);
        prop_assert_eq!(normalize(&input), input);
    }

    #[test]
    fn prop_timestamps_round_trip(instant in arb_timestamp()) {
        let normalized = normalize(&Payload::object().with("at", instant));
        let Some(Payload::String(text)) = normalized.get("at") else {
            return Err(TestCaseError::fail("timestamp was not converted"));
        };
        prop_assert_eq!(text, &iso8601(&instant));
        let parsed = DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc);
        prop_assert_eq!(parsed, instant);
    }

    #[test]
    fn prop_arrays_preserve_length(items in prop::collection::vec(arb_payload(), 0..10)) {
        let normalized = normalize(&Payload::Array(items.clone()));
        let Payload::Array(out) = normalized else {
            return Err(TestCaseError::fail("array changed shape"));
        };
        prop_assert_eq!(out.len(), items.len());
    }

    #[test]
    fn prop_uploads_pass_through_untouched(payload in arb_payload()) {
        let (mut before, mut after) = (Vec::new(), Vec::new());
        binaries(&payload, &mut before);
        binaries(&normalize(&payload), &mut after);
        prop_assert_eq!(after, before);
    }

    #[test]
    fn prop_top_level_upload_is_returned_as_is(upload in arb_binary()) {
        prop_assert_eq!(normalize(&upload), upload);
    }
}
