//! Canonical serialization for fingerprints.
//!
//! Consolidated slice sets, kernel parameters and hypotheses exports are
//! fingerprinted so that two runs over the same input can be compared by a
//! single hash.
//!
//! ## Determinism Guarantees
//!
//! - Struct fields serialize in declaration order
//! - Vectors serialize in index order (slice insertion order is meaningful)
//! - Maps in hashed data are `BTreeMap`/`BTreeSet`, never `HashMap`
//! - Floats that feed parameter hashes are quantized first (see `config`)

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Only plain data types are hashed, so serialization cannot fail.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// xxh64 of the canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// xxh64 of the canonical bytes as 16 lowercase hex digits.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_hash_is_stable() {
        let mut levels = BTreeMap::new();
        levels.insert(1u32, vec![3u32, 4]);
        levels.insert(0u32, vec![1u32, 2]);

        assert_eq!(canonical_hash(&levels), canonical_hash(&levels.clone()));
        assert_eq!(canonical_hash_hex(&levels).len(), 16);
    }

    #[test]
    fn test_order_sensitive_for_vectors() {
        assert_ne!(canonical_hash(&vec![1u32, 2]), canonical_hash(&vec![2u32, 1]));
    }
}
