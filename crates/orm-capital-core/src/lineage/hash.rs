//! Canonical JSON serialization and the SHA-256 hash chain (§4.8).

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The all-zero digest that seeds every audit chain.
pub const CHAIN_SEED: &str = "0000000000000000000000000000000000000000000000000000000000000000"; // 64 zeros


/// Recursively sort every object's keys lexicographically so that list
/// ordering in the source structure, not key ordering, is the only thing
/// that can change the serialized bytes.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON string for `value` — lexicographically sorted object
/// keys, compact separators, no whitespace.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let raw = serde_json::to_value(value)?;
    let sorted = canonicalize(&raw);
    serde_json::to_string(&sorted)
}

/// SHA-256 over the canonical JSON serialization of `value`.
pub fn sha256_of<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let canonical = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// `immutable_hash = SHA256(prior.immutable_hash || canonical(this_row))`.
pub fn chain_hash<T: Serialize>(prior_immutable_hash: &str, row_content: &T) -> serde_json::Result<String> {
    let canonical = canonical_json(row_content)?;
    let mut hasher = Sha256::new();
    hasher.update(prior_immutable_hash.as_bytes());
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys_regardless_of_insertion_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn canonical_round_trips_through_decode() {
        let value = json!({"z": [3, 1, 2], "a": {"y": 1, "x": 2}});
        let once = canonical_json(&value).unwrap();
        let decoded: Value = serde_json::from_str(&once).unwrap();
        let twice = canonical_json(&decoded).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn chain_hash_changes_with_prior_hash() {
        let row = json!({"op": "calculation_started"});
        let h1 = chain_hash(CHAIN_SEED, &row).unwrap();
        let h2 = chain_hash(&h1, &row).unwrap();
        assert_ne!(h1, h2);
    }
}
