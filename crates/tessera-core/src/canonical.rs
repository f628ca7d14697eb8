//! # Canonical Serialization
//!
//! [`CanonicalBytes`] is the only construction path for bytes that feed a
//! [`Fingerprint`](crate::Fingerprint).
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. The only way to construct `CanonicalBytes`
//! is through [`CanonicalBytes::new()`], which serializes through a
//! `serde_json::Value` (whose object maps are ordered by key) and emits
//! compact output. Two values that serialize to the same JSON document
//! therefore produce identical bytes regardless of field declaration order or
//! process lifetime.
//!
//! ## Rules
//!
//! 1. Reject floats. Voting power, heights and rounds are integers.
//! 2. Sort object keys lexicographically.
//! 3. Use compact separators (no whitespace).

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        Ok(Self(serde_json::to_vec(&value)?))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) if n.is_f64() => Err(CanonicalizationError::FloatRejected(
            n.as_f64().unwrap_or(f64::NAN),
        )),
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted() {
        let cb = CanonicalBytes::new(&json!({"b": 1, "a": 2})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"a":2,"b":1}"#);
    }

    #[test]
    fn nested_keys_are_sorted() {
        let cb = CanonicalBytes::new(&json!({"z": {"y": 1, "x": [1, 2]}})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"z":{"x":[1,2],"y":1}}"#);
    }

    #[test]
    fn floats_are_rejected() {
        let err = CanonicalBytes::new(&json!({"power": 1.5})).unwrap_err();
        assert!(matches!(err, CanonicalizationError::FloatRejected(f) if f == 1.5));
    }

    #[test]
    fn floats_inside_arrays_are_rejected() {
        assert!(CanonicalBytes::new(&json!([1, [2, 0.25]])).is_err());
    }

    #[test]
    fn integers_pass() {
        let cb = CanonicalBytes::new(&json!({"height": u64::MAX})).unwrap();
        assert_eq!(cb.into_bytes(), format!("{{\"height\":{}}}", u64::MAX).into_bytes());
    }
}
