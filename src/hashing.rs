//! Deterministic hashing. The hashing data structures in the standard library are randomly
//! seeded, which would make iteration order (and therefore the order in which random numbers are
//! drawn) differ between runs with the same seed. Everything in this crate that iterates a map
//! while drawing random numbers uses the `HashMap` and `HashSet` aliases exported here.
//!
//! `HashMap<K, V, S>` does not have a `new` method with a custom hasher; use
//! `HashMap::default()` instead.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute the hash of a `&str`. Used to derive a per-stream seed
/// offset in `crate::random`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        assert_eq!(hash_str("hello"), hash_str("hello"));
        assert_ne!(hash_str("hello"), hash_str("world"));
    }

    #[test]
    fn maps_are_default_constructible() {
        let mut map: HashMap<&str, u32> = HashMap::default();
        map.insert("a", 1);
        let mut set: HashSet<u32> = HashSet::default();
        set.insert(1);
        assert_eq!(map.get("a"), Some(&1));
        assert!(set.contains(&1));
    }
}
