// crates/credence-store/src/lib.rs
//
// credence-store: Storage layer for the Credence engine.
//
// Provides the two `DocumentStore` backends (a DashMap-backed in-memory
// store and a RocksDB-backed persistent store), striped per-key locks so
// commits on different keys never serialize behind each other, and the
// optimistic transaction runner with bounded retry used by every
// read-modify-write in the engine.

pub mod locks;
pub mod memory;
pub mod rocks;
pub mod txn;

// Re-export key types for ergonomic access from downstream crates.
pub use locks::KeyLocks;
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use txn::{run_transaction, with_retry, RetryPolicy, Snapshot, TxnPlan};
