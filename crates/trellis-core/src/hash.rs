//! Hashing for element keys and the reconciler's lookup tables.
//!
//! Uses `ahash` and `hashbrown` unless the `std-hash` feature selects the
//! standard library's hasher and map.

use std::hash::{Hash, Hasher};

#[cfg(feature = "std-hash")]
type KeyHasher = std::collections::hash_map::DefaultHasher;
#[cfg(not(feature = "std-hash"))]
type KeyHasher = ahash::AHasher;

#[cfg(feature = "std-hash")]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;
#[cfg(not(feature = "std-hash"))]
pub(crate) type Map<K, V> = hashbrown::HashMap<K, V>;

/// 64-bit digest of `value`, stable for the lifetime of the process.
#[inline]
pub fn key_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = KeyHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_hash_equal() {
        assert_eq!(key_hash("row-1"), key_hash(&String::from("row-1")));
        assert_ne!(key_hash(&1u64), key_hash(&2u64));
    }
}
