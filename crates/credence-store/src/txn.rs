// crates/credence-store/src/txn.rs
//
// Optimistic read-modify-write transactions over a `DocumentStore`.
//
// A transaction declares the keys it reads, receives a `Snapshot` of them,
// and returns the writes to apply. The commit pins every read key to the
// version observed in the snapshot; if another writer got there first the
// store answers `Conflict` and the whole attempt is re-run from a fresh
// snapshot. The body is synchronous, so nothing slow can run while a key
// is being contended.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;

use credence_core::document::{DocKey, Document, Precondition, Write};
use credence_core::error::CredenceError;
use credence_core::traits::DocumentStore;

/// Default number of attempts before surfacing `Conflict` / `StoreUnavailable`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base backoff between attempts. Attempt `n` waits `n * backoff`.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Bounded retry policy for transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// Versions and bodies of the keys a transaction read.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    docs: HashMap<DocKey, Option<Document>>,
}

impl Snapshot {
    /// Raw document for a read key. `None` if absent or not part of the read set.
    pub fn get(&self, key: &DocKey) -> Option<&Document> {
        self.docs.get(key).and_then(|d| d.as_ref())
    }

    /// Decode a read key into a typed record.
    pub fn decode<T: DeserializeOwned>(&self, key: &DocKey) -> Result<Option<T>, CredenceError> {
        self.get(key).map(Document::decode).transpose()
    }

    fn preconditions(&self) -> Vec<Precondition> {
        self.docs
            .iter()
            .map(|(key, doc)| match doc {
                Some(d) => Precondition::at_version(key.clone(), d.version),
                None => Precondition::absent(key.clone()),
            })
            .collect()
    }
}

/// Writes produced by a transaction body, plus the value handed back to the caller.
#[derive(Debug)]
pub struct TxnPlan<T> {
    pub writes: Vec<Write>,
    pub output: T,
}

impl<T> TxnPlan<T> {
    pub fn new(writes: Vec<Write>, output: T) -> Self {
        Self { writes, output }
    }

    /// A plan that commits nothing.
    pub fn read_only(output: T) -> Self {
        Self {
            writes: Vec::new(),
            output,
        }
    }
}

async fn read_snapshot<S>(store: &S, keys: &[DocKey]) -> Result<Snapshot, CredenceError>
where
    S: DocumentStore + ?Sized,
{
    let mut docs = HashMap::with_capacity(keys.len());
    for key in keys {
        if !docs.contains_key(key) {
            let doc = store.get(key).await?;
            docs.insert(key.clone(), doc);
        }
    }
    Ok(Snapshot { docs })
}

/// Run `body` as an optimistic transaction over `keys`.
///
/// Retries on `Conflict` and `StoreUnavailable` up to `policy.max_attempts`,
/// then surfaces the last such error. Any other error from the store or the
/// body returns immediately.
pub async fn run_transaction<S, F, T>(
    store: &S,
    policy: &RetryPolicy,
    keys: &[DocKey],
    mut body: F,
) -> Result<T, CredenceError>
where
    S: DocumentStore + ?Sized,
    F: FnMut(&Snapshot) -> Result<TxnPlan<T>, CredenceError> + Send,
    T: Send,
{
    let mut attempt = 1;
    loop {
        let result = match read_snapshot(store, keys).await {
            Ok(snapshot) => match body(&snapshot) {
                Ok(plan) if plan.writes.is_empty() => return Ok(plan.output),
                Ok(plan) => store
                    .commit(&snapshot.preconditions(), &plan.writes)
                    .await
                    .map(|()| plan.output),
                Err(e) => return Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => return Ok(output),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                tracing::debug!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "transaction attempt failed, retrying"
                );
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(CredenceError::Conflict(msg)) => {
                tracing::warn!(attempts = attempt, "transaction retries exhausted");
                return Err(CredenceError::Conflict(format!(
                    "retries exhausted after {} attempts: {}",
                    attempt, msg
                )));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Retry a single store primitive (e.g. `create_if_absent`) on transient errors.
///
/// Same bounded policy as `run_transaction`, for calls that are atomic on
/// their own and need no snapshot.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T, CredenceError>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, CredenceError>> + Send,
    T: Send,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                tracing::debug!(attempt, error = %e, "store call failed, retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use credence_core::document::Collection;
    use serde_json::json;
    use std::sync::Arc;

    fn counter_key() -> DocKey {
        DocKey::new(Collection::CommunityPosts, "counter")
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    async fn increment(store: &MemoryStore, policy: &RetryPolicy) -> Result<u64, CredenceError> {
        let key = counter_key();
        run_transaction(store, policy, &[key.clone()], |snap| {
            let current: u64 = snap.decode(&key)?.unwrap_or(0);
            let next = current + 1;
            Ok(TxnPlan::new(vec![Write::put(key.clone(), &next)?], next))
        })
        .await
    }

    #[tokio::test]
    async fn test_applies_writes_and_returns_output() {
        let store = MemoryStore::new();
        assert_eq!(increment(&store, &fast_policy()).await.unwrap(), 1);
        assert_eq!(increment(&store, &fast_policy()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_retries_through_transient_conflicts() {
        let store = MemoryStore::new();
        store.inject_conflicts(2);
        assert_eq!(increment(&store, &fast_policy()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_conflict() {
        let store = MemoryStore::new();
        store.inject_conflicts(3);
        let err = increment(&store, &fast_policy()).await.unwrap_err();
        assert!(matches!(err, CredenceError::Conflict(_)));
        assert!(store.get(&counter_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_surfaces_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        let err = increment(&store, &fast_policy()).await.unwrap_err();
        assert!(matches!(err, CredenceError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_body_errors_are_not_retried() {
        let store = MemoryStore::new();
        let mut calls = 0;
        let err = run_transaction(&store, &fast_policy(), &[counter_key()], |_snap| {
            calls += 1;
            Err::<TxnPlan<()>, _>(CredenceError::NotFound("post".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CredenceError::NotFound(_)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_read_only_plans_skip_commit() {
        let store = MemoryStore::new();
        store.inject_conflicts(1);
        let out = run_transaction(&store, &fast_policy(), &[counter_key()], |snap| {
            Ok(TxnPlan::read_only(snap.get(&counter_key()).is_none()))
        })
        .await
        .unwrap();
        assert!(out);
    }

    #[tokio::test]
    async fn test_with_retry_stops_after_policy_attempts() {
        let mut calls = 0u32;
        let err = with_retry(&fast_policy(), || {
            calls += 1;
            async { Err::<(), _>(CredenceError::StoreUnavailable("down".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CredenceError::StoreUnavailable(_)));
        assert_eq!(calls, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let policy = RetryPolicy::new(64, Duration::from_millis(1));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { increment(&store, &policy).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let doc = store.get(&counter_key()).await.unwrap().unwrap();
        assert_eq!(doc.body, json!(8));
    }
}
