//! Package fingerprints
//!
//! A fingerprint is the SHA-256 digest (64 lowercase hex characters) of the
//! canonical JSON form of a payload. Canonical JSON has object keys sorted at
//! every depth and no insignificant whitespace, so the digest does not depend
//! on the order in which a producer inserted fields.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Length of a hex-encoded fingerprint
pub const FINGERPRINT_LEN: usize = 64;

/// Rebuild a JSON value with object keys sorted at every depth.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Fingerprint of an already-parsed JSON payload.
#[must_use]
pub fn fingerprint_value(payload: &Value) -> String {
    let canonical = canonicalize(payload).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of any serializable payload.
pub fn fingerprint<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    Ok(fingerprint_value(&serde_json::to_value(payload)?))
}

/// Whether `declared` is the fingerprint of `payload`. Hex case is not significant.
pub fn verify<T: Serialize + ?Sized>(declared: &str, payload: &T) -> bool {
    fingerprint(payload).is_ok_and(|actual| actual.eq_ignore_ascii_case(declared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_is_64_lowercase_hex() {
        let digest = fingerprint_value(&json!({"races": [], "runners": []}));
        assert_eq!(digest.len(), FINGERPRINT_LEN);
        assert!(digest
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch)));
    }

    #[test]
    fn fingerprint_matches_independently_computed_sha256() {
        let payload = json!({"b": 1, "a": [true, null]});

        let mut hasher = Sha256::new();
        hasher.update(br#"{"a":[true,null],"b":1}"#);
        let expected = format!("{:x}", hasher.finalize());

        assert_eq!(fingerprint_value(&payload), expected);
    }

    #[test]
    fn fingerprint_ignores_key_insertion_order() {
        let mut forward = Map::new();
        forward.insert("raceId".to_string(), json!(1));
        forward.insert("runners".to_string(), json!([{"number": 1, "status": "passed"}]));

        let mut backward = Map::new();
        backward.insert("runners".to_string(), json!([{"status": "passed", "number": 1}]));
        backward.insert("raceId".to_string(), json!(1));

        assert_eq!(
            fingerprint_value(&Value::Object(forward)),
            fingerprint_value(&Value::Object(backward))
        );
    }

    #[test]
    fn fingerprint_changes_with_array_order() {
        let first = json!({"runners": [1, 2]});
        let second = json!({"runners": [2, 1]});
        assert_ne!(fingerprint_value(&first), fingerprint_value(&second));
    }

    #[test]
    fn verify_accepts_own_fingerprint_repeatedly() {
        let payload = json!({"races": [{"id": 1, "name": "Ridge"}]});
        let digest = fingerprint(&payload).unwrap();

        for _ in 0..3 {
            assert!(verify(&digest, &payload));
        }
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let payload = json!({"races": [{"id": 1, "name": "Ridge"}]});
        let digest = fingerprint(&payload).unwrap().to_ascii_uppercase();

        assert!(verify(&digest, &payload));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let payload = json!({"runners": [{"id": 1, "status": "passed"}]});
        let digest = fingerprint(&payload).unwrap();

        let serialized = payload.to_string().replacen("passed", "passer", 1);
        let tampered: Value = serde_json::from_str(&serialized).unwrap();

        assert!(!verify(&digest, &tampered));
    }
}
