// crates/credence-store/src/rocks.rs
//
// RocksDB-backed persistent `DocumentStore`.
//
// Key format:
//   - `{collection}:{id}` -> JSON-serialized `Document` (version + body)
//
// Commits lock the stripes of the keys they touch, verify preconditions
// against the current on-disk versions, then apply every write in a single
// atomic `WriteBatch`. The version clock is rebuilt on open from the highest
// version found on disk, so live documents never see their version reused.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rocksdb::{DBWithThreadMode, IteratorMode, MultiThreaded, Options, WriteBatch};

use credence_core::document::{Collection, DocKey, Document, Precondition, Write};
use credence_core::error::CredenceError;
use credence_core::traits::DocumentStore;

use crate::locks::KeyLocks;

/// RocksDB wrapper implementing the `DocumentStore` trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
    locks: KeyLocks,
    clock: AtomicU64,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, CredenceError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            CredenceError::StoreUnavailable(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        let store = Self {
            db,
            locks: KeyLocks::default(),
            clock: AtomicU64::new(0),
        };
        let high_water = store.max_version()?;
        store.clock.store(high_water, Ordering::SeqCst);
        Ok(store)
    }

    /// Scan every document for the highest version on disk.
    fn max_version(&self) -> Result<u64, CredenceError> {
        let mut max = 0;
        for item in self.db.iterator(IteratorMode::Start) {
            let (_key, value) = item
                .map_err(|e| CredenceError::StoreUnavailable(format!("RocksDB iteration error: {}", e)))?;
            let doc: Document = serde_json::from_slice(&value)?;
            max = max.max(doc.version);
        }
        Ok(max)
    }

    fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get raw bytes from RocksDB, mapping errors to `StoreUnavailable`.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, CredenceError> {
        self.db
            .get(key)
            .map_err(|e| CredenceError::StoreUnavailable(format!("RocksDB get failed: {}", e)))
    }

    /// Write a batch atomically, mapping errors to `StoreUnavailable`.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), CredenceError> {
        self.db
            .write(batch)
            .map_err(|e| CredenceError::StoreUnavailable(format!("RocksDB write failed: {}", e)))
    }

    /// Public accessor: read a document without going through the async trait.
    pub fn get_sync(&self, key: &DocKey) -> Result<Option<Document>, CredenceError> {
        match self.get_raw(key.encode().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Synchronous commit body. Holds the stripe guards for its whole duration.
    pub fn commit_sync(
        &self,
        preconditions: &[Precondition],
        writes: &[Write],
    ) -> Result<(), CredenceError> {
        let encoded: Vec<String> = preconditions
            .iter()
            .map(|p| p.key.encode())
            .chain(writes.iter().map(|w| w.key().encode()))
            .collect();
        let _guards = self.locks.lock_keys(encoded.iter().map(String::as_str));

        for pre in preconditions {
            let current = self.get_sync(&pre.key)?.map(|d| d.version);
            if current != pre.expected_version {
                return Err(CredenceError::Conflict(format!(
                    "{} expected version {:?}, found {:?}",
                    pre.key, pre.expected_version, current
                )));
            }
        }

        let mut batch = WriteBatch::default();
        for write in writes {
            match write {
                Write::Put { key, body } => {
                    let doc = Document {
                        version: self.next_version(),
                        body: body.clone(),
                    };
                    batch.put(key.encode().as_bytes(), serde_json::to_vec(&doc)?);
                }
                Write::Delete { key } => batch.delete(key.encode().as_bytes()),
            }
        }
        self.write_batch(batch)
    }

    /// Synchronous create-if-absent under the key's stripe lock.
    pub fn create_if_absent_sync(
        &self,
        key: &DocKey,
        body: serde_json::Value,
    ) -> Result<(Document, bool), CredenceError> {
        let encoded = key.encode();
        let _guards = self.locks.lock_keys([encoded.as_str()]);

        if let Some(existing) = self.get_sync(key)? {
            return Ok((existing, false));
        }
        let doc = Document {
            version: self.next_version(),
            body,
        };
        let mut batch = WriteBatch::default();
        batch.put(encoded.as_bytes(), serde_json::to_vec(&doc)?);
        self.write_batch(batch)?;
        Ok((doc, true))
    }
}

#[async_trait]
impl DocumentStore for RocksStore {
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
        let encoded = key.encode();
        let _guards = self.locks.lock_keys([encoded.as_str()]);
        let existed = self.get_raw(encoded.as_bytes())?.is_some();
        if existed {
            let mut batch = WriteBatch::default();
            batch.delete(encoded.as_bytes());
            self.write_batch(batch)?;
        }
        Ok(existed)
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(String, Document)>, CredenceError> {
        let prefix_str = collection.key_prefix();
        let prefix = prefix_str.as_bytes();
        let mut docs = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item
                .map_err(|e| CredenceError::StoreUnavailable(format!("RocksDB iteration error: {}", e)))?;

            // Keys are `{collection}:{id}`. Stop when the prefix no longer matches.
            if !key.starts_with(prefix) {
                break;
            }

            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            let doc: Document = serde_json::from_slice(&value)?;
            docs.push((id, doc));
        }

        Ok(docs)
    }
}
