//! Canonical hashing.
//!
//! Deterministic canonical serialization + SHA-256 hashing of state.
//!
//! Rules:
//!   - projection_version first, then oddSum, evenSum, sum
//!   - absent `sum` is written as `null`
//!   - UTF-8 JSON, no whitespace, no float

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::ProjectionState;
use crate::PROJECTION_VERSION;

/// Canonical serialization of state to UTF-8 JSON bytes.
pub fn canonical_serialize(state: &ProjectionState) -> Vec<u8> {
    build_canonical_value(state).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex.
pub fn canonical_hash(state: &ProjectionState) -> String {
    let digest = Sha256::digest(canonical_serialize(state));
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn build_canonical_value(state: &ProjectionState) -> Value {
    // serde_json::Map preserves insertion order (preserve_order feature).
    let mut root = Map::new();
    root.insert(
        "projection_version".to_string(),
        Value::Number((PROJECTION_VERSION as i64).into()),
    );
    root.insert("oddSum".to_string(), Value::Number(state.odd_sum.into()));
    root.insert("evenSum".to_string(), Value::Number(state.even_sum.into()));
    root.insert(
        "sum".to_string(),
        state.sum.map_or(Value::Null, |s| Value::Number(s.into())),
    );
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_initial_state;

    #[test]
    fn test_canonical_layout() {
        let mut s = create_initial_state();
        assert_eq!(
            String::from_utf8(canonical_serialize(&s)).unwrap(),
            r#"{"projection_version":1,"oddSum":0,"evenSum":0,"sum":null}"#
        );
        s.sum = Some(12);
        assert_eq!(
            String::from_utf8(canonical_serialize(&s)).unwrap(),
            r#"{"projection_version":1,"oddSum":0,"evenSum":0,"sum":12}"#
        );
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let h = canonical_hash(&create_initial_state());
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_distinguishes_absent_and_zero_sum() {
        let absent = create_initial_state();
        let mut zero = create_initial_state();
        zero.sum = Some(0);
        assert_ne!(canonical_hash(&absent), canonical_hash(&zero));
    }
}
