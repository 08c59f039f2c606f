//! Canonical encoding and SHA-256 hashing used for block hashes.
//!
//! Canonicalization relies on `serde_json::Value`'s default `Map`
//! representation being a `BTreeMap`, so serializing any `Serialize` value
//! through it yields object keys in sorted order with no extra bookkeeping.
//! The same encode path is used to produce a hash and to verify one.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serializes `value` into its canonical (sorted-key) JSON byte form.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    let canonical = serde_json::to_value(value).expect("value must be representable as JSON");
    serde_json::to_vec(&canonical).expect("canonical JSON value always serializes")
}

/// SHA-256 of `bytes`, formatted as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Unordered {
        z: u32,
        a: u32,
    }

    #[test]
    fn encoding_is_order_independent_on_struct_fields() {
        #[derive(Serialize)]
        struct Reordered {
            a: u32,
            z: u32,
        }
        let one = canonical_bytes(&Unordered { z: 2, a: 1 });
        let two = canonical_bytes(&Reordered { a: 1, z: 2 });
        assert_eq!(one, two);
    }

    #[test]
    fn sha256_hex_is_deterministic_and_correct_length() {
        let digest = sha256_hex(b"abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, sha256_hex(b"abc"));
    }
}
