// crates/credence-store/src/locks.rs
//
// Striped per-key locks for store commits.
//
// Each encoded key hashes (FNV-1a) onto one of `num_stripes` mutexes. A commit
// locks the stripes of exactly the keys it touches, in ascending stripe order,
// so commits on disjoint keys run in parallel and multi-key commits cannot
// deadlock each other. The same key always maps to the same stripe.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default stripe count. Power of two, large enough that unrelated keys
/// rarely share a stripe.
pub const DEFAULT_STRIPES: usize = 256;

/// Fixed table of key-striped mutexes.
#[derive(Debug)]
pub struct KeyLocks {
    stripes: Vec<Mutex<()>>,
}

impl KeyLocks {
    /// Create a lock table with the given number of stripes.
    ///
    /// # Panics
    ///
    /// Panics if `num_stripes` is 0.
    pub fn new(num_stripes: usize) -> Self {
        assert!(num_stripes > 0, "num_stripes must be > 0");
        Self {
            stripes: (0..num_stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Deterministically assign an encoded key to a stripe in `[0, num_stripes)`.
    pub fn stripe_of(&self, key: &str) -> usize {
        let mut hash: u64 = 0xcbf29ce484222325; // FNV-1a offset basis
        for &byte in key.as_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3); // FNV-1a prime
        }
        (hash % self.stripes.len() as u64) as usize
    }

    /// Lock every stripe covering `keys`. Guards release on drop.
    pub fn lock_keys<'a, I>(&self, keys: I) -> Vec<MutexGuard<'_, ()>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indexes: Vec<usize> = keys.into_iter().map(|k| self.stripe_of(k)).collect();
        indexes.sort_unstable();
        indexes.dedup();
        // The guarded value is `()`, so a poisoned stripe carries no broken state.
        indexes
            .into_iter()
            .map(|i| self.stripes[i].lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    /// Lock every stripe, in ascending order. Used by full scans that must
    /// not interleave with any commit.
    pub fn lock_all(&self) -> Vec<MutexGuard<'_, ()>> {
        self.stripes
            .iter()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    /// Return the total number of stripes.
    pub fn num_stripes(&self) -> usize {
        self.stripes.len()
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
