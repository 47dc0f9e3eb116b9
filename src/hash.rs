//! The hash adapter: opaque key to nonzero `H`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The constant a genuine hash of `0` is remapped to.
///
/// `0` is reserved to mean "this bucket is empty", so the hash adapter
/// must never hand the table a zero hash for a real key.
const ZERO_REPLACEMENT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Hash a key to a nonzero `H`.
///
/// Uses `SipHash` via `DefaultHasher`, the same choice `chashmap::hash`
/// makes, plus the zero-sentinel remap the core spec's hash adapter must
/// provide.
pub fn hash<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    match hasher.finish() {
        0 => ZERO_REPLACEMENT,
        h => h,
    }
}
