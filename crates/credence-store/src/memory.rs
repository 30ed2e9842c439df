// crates/credence-store/src/memory.rs
//
// In-memory `DocumentStore` backed by a `DashMap`.
//
// Intended for tests, embedding, and the `memory` backend of the CLI.
// Commits take the striped key locks of the keys they touch, check every
// precondition, then apply all writes before releasing the locks. Reads take
// the same stripes (a scan takes all of them), so no reader observes a
// partially applied commit.
//
// Two switches simulate backing-store failures: `set_available(false)`
// makes every call fail with `StoreUnavailable`, and `inject_conflicts(n)`
// fails the next `n` commits with `Conflict`.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use credence_core::document::{Collection, DocKey, Document, Precondition, Write};
use credence_core::error::CredenceError;
use credence_core::traits::DocumentStore;

use crate::locks::KeyLocks;

/// DashMap-based document store.
#[derive(Debug)]
pub struct MemoryStore {
    docs: DashMap<DocKey, Document>,
    locks: KeyLocks,
    /// Store-wide write sequence; every write gets a fresh version.
    clock: AtomicU64,
    available: AtomicBool,
    injected_conflicts: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            locks: KeyLocks::default(),
            clock: AtomicU64::new(0),
            available: AtomicBool::new(true),
            injected_conflicts: AtomicUsize::new(0),
        }
    }

    /// Toggle simulated reachability of the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fail the next `n` commits with `Conflict`, as if another writer won.
    pub fn inject_conflicts(&self, n: usize) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn ensure_available(&self) -> Result<(), CredenceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CredenceError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }

    fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Read a key under its stripe lock.
    pub fn get_sync(&self, key: &DocKey) -> Result<Option<Document>, CredenceError> {
        self.ensure_available()?;
        let encoded = key.encode();
        let _guards = self.locks.lock_keys([encoded.as_str()]);
        Ok(self.docs.get(key).map(|d| d.value().clone()))
    }

    /// Every document in a collection, sorted by id, read with all stripes held.
    pub fn list_sync(&self, collection: Collection) -> Result<Vec<(String, Document)>, CredenceError> {
        self.ensure_available()?;
        let _guards = self.locks.lock_all();
        let mut out: Vec<(String, Document)> = self
            .docs
            .iter()
            .filter(|entry| entry.key().collection == collection)
            .map(|entry| (entry.key().id.clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Synchronous commit body. Holds the stripe guards for its whole duration.
    pub fn commit_sync(
        &self,
        preconditions: &[Precondition],
        writes: &[Write],
    ) -> Result<(), CredenceError> {
        self.ensure_available()?;

        let encoded: Vec<String> = preconditions
            .iter()
            .map(|p| p.key.encode())
            .chain(writes.iter().map(|w| w.key().encode()))
            .collect();
        let _guards = self.locks.lock_keys(encoded.iter().map(String::as_str));

        if self.take_injected_conflict() {
            return Err(CredenceError::Conflict("injected conflict".to_string()));
        }

        for pre in preconditions {
            let current = self.docs.get(&pre.key).map(|d| d.version);
            if current != pre.expected_version {
                return Err(CredenceError::Conflict(format!(
                    "{} expected version {:?}, found {:?}",
                    pre.key, pre.expected_version, current
                )));
            }
        }

        for write in writes {
            match write {
                Write::Put { key, body } => {
                    let doc = Document {
                        version: self.next_version(),
                        body: body.clone(),
                    };
                    self.docs.insert(key.clone(), doc);
                }
                Write::Delete { key } => {
                    self.docs.remove(key);
                }
            }
        }
        Ok(())
    }

    /// Synchronous create-if-absent under the key's stripe lock.
    pub fn create_if_absent_sync(
        &self,
        key: &DocKey,
        body: serde_json::Value,
    ) -> Result<(Document, bool), CredenceError> {
        self.ensure_available()?;
        let encoded = key.encode();
        let _guards = self.locks.lock_keys([encoded.as_str()]);

        if let Some(existing) = self.docs.get(key) {
            return Ok((existing.value().clone(), false));
        }
        let doc = Document {
            version: self.next_version(),
            body,
        };
        self.docs.insert(key.clone(), doc.clone());
        Ok((doc, true))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Document>, CredenceError> {
        self.get_sync(key)
    }

    async fn create_if_absent(
        &self,
        key: &DocKey,
        body: serde_json::Value,
    ) -> Result<(Document, bool), CredenceError> {
        self.create_if_absent_sync(key, body)
    }

    async fn commit(
        &self,
        preconditions: &[Precondition],
        writes: &[Write],
    ) -> Result<(), CredenceError> {
        self.commit_sync(preconditions, writes)
    }

    async fn delete(&self, key: &DocKey) -> Result<bool, CredenceError> {
        self.ensure_available()?;
        let encoded = key.encode();
        let _guards = self.locks.lock_keys([encoded.as_str()]);
        Ok(self.docs.remove(key).is_some())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(String, Document)>, CredenceError> {
        self.list_sync(collection)
    }
}
