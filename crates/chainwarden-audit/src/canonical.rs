//! Canonical payload bytes.
//!
//! A payload's canonical form is compact JSON with object keys sorted
//! lexicographically at every depth. Strings are escaped the way
//! `serde_json` escapes them. Numbers keep the digits they were parsed
//! from (`arbitrary_precision`), so no two distinct number literals share
//! canonical bytes. Both the writer and the verifier
//! hash these bytes, so reformatting an entry file (whitespace, key order)
//! does not change its hash, while any change to the data does.

use serde_json::{Map, Value};

/// Canonical bytes of a payload, the input to the link hash.
#[must_use]
pub fn canonical_bytes(payload: &Value) -> Vec<u8> {
    canonicalize(payload).to_string().into_bytes()
}

/// Rebuild `value` with every object's keys inserted in sorted order.
///
/// Insertion order is what `serde_json` writes whether or not its
/// `preserve_order` feature is enabled, so the output is sorted either way.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                if let Some(inner) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize(inner));
                }
            }
            Value::Object(sorted)
        },
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
