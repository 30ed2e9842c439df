// crates/credence-core/src/traits.rs

use async_trait::async_trait;

use crate::document::{Collection, DocKey, Document, Precondition, Write};
use crate::domain::DomainCredibility;
use crate::error::CredenceError;
use crate::events::VoteApplied;

/// Trait for the transactional keyed document store.
///
/// Implemented by credence-store (in-memory and RocksDB backends).
/// Every method fails with `CredenceError::StoreUnavailable` when the
/// backing store cannot be reached.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document by key.
    async fn get(&self, key: &DocKey) -> Result<Option<Document>, CredenceError>;

    /// Atomically create the document if absent.
    ///
    /// Returns the stored document and whether this call created it.
    /// Concurrent callers for the same key converge on a single document.
    async fn create_if_absent(
        &self,
        key: &DocKey,
        body: serde_json::Value,
    ) -> Result<(Document, bool), CredenceError>;

    /// Atomically apply `writes` if every precondition holds.
    ///
    /// Fails with `CredenceError::Conflict` (applying nothing) if any key
    /// is not at its expected version.
    async fn commit(
        &self,
        preconditions: &[Precondition],
        writes: &[Write],
    ) -> Result<(), CredenceError>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, key: &DocKey) -> Result<bool, CredenceError>;

    /// List every document in a collection as `(id, document)` pairs.
    async fn list(&self, collection: Collection) -> Result<Vec<(String, Document)>, CredenceError>;
}

/// Consumer of committed vote events.
///
/// Implemented by credence-scoring's domain score store, which moves the
/// community score of the post's domain.
#[async_trait]
pub trait VoteEventSink: Send + Sync {
    /// Apply the event's delta and return the domain's updated credibility.
    async fn on_vote_applied(&self, event: &VoteApplied) -> Result<DomainCredibility, CredenceError>;
}
