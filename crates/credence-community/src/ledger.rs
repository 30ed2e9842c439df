// crates/credence-community/src/ledger.rs
//
// VoteLedger: one record per (target, user) holding that user's active vote.
//
// Key format: `{post_votes|comment_votes}:{target_id}|{user_id}`.
// A missing record is `NoVote`. Records are written only inside the vote
// aggregator's transaction, which is why the write builder is crate-private.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use credence_core::document::{DocKey, Write};
use credence_core::error::CredenceError;
use credence_core::traits::DocumentStore;
use credence_core::vote::{TargetRef, VoteState, VoteType};
use credence_store::{with_retry, RetryPolicy, Snapshot};

use crate::models::VoteRecord;

const KEY_SEPARATOR: char = '|';

/// Reject ids that would make ledger keys ambiguous.
pub fn validate_id(what: &str, id: &str) -> Result<(), CredenceError> {
    if id.trim().is_empty() {
        return Err(CredenceError::InvalidArgument(format!("{} id is empty", what)));
    }
    if id.contains(KEY_SEPARATOR) {
        return Err(CredenceError::InvalidArgument(format!(
            "{} id {:?} contains reserved character {:?}",
            what, id, KEY_SEPARATOR
        )));
    }
    Ok(())
}

/// Per-(target, user) vote records.
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Ledger key for a (target, user) pair.
    pub fn key(target: &TargetRef, user_id: &str) -> DocKey {
        DocKey::new(
            target.kind.ledger_collection(),
            format!("{}{}{}", target.id, KEY_SEPARATOR, user_id),
        )
    }

    /// The user's current vote on the target. Store failures are errors,
    /// never `None`.
    pub async fn current_vote(
        &self,
        target: &TargetRef,
        user_id: &str,
    ) -> Result<Option<VoteType>, CredenceError> {
        let key = Self::key(target, user_id);
        let doc = with_retry(&self.policy, || self.store.get(&key)).await?;
        match doc {
            Some(doc) => Ok(Some(doc.decode::<VoteRecord>()?.vote_type)),
            None => Ok(None),
        }
    }

    /// Vote state of a ledger key inside a transaction snapshot.
    pub(crate) fn state_in(snapshot: &Snapshot, key: &DocKey) -> Result<VoteState, CredenceError> {
        let record: Option<VoteRecord> = snapshot.decode(key)?;
        Ok(VoteState::from(record.map(|r| r.vote_type)))
    }

    /// Write that moves the ledger record to `next`: put on a vote, delete on `NoVote`.
    pub(crate) fn write_for(
        key: DocKey,
        target: &TargetRef,
        user_id: &str,
        next: VoteState,
        now: DateTime<Utc>,
    ) -> Result<Write, CredenceError> {
        match next.vote() {
            Some(vote_type) => Write::put(
                key,
                &VoteRecord {
                    target_id: target.id.clone(),
                    user_id: user_id.to_string(),
                    vote_type,
                    updated_at: now,
                },
            ),
            None => Ok(Write::delete(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credence_core::document::Collection;
    use credence_store::MemoryStore;

    #[test]
    fn test_keys_are_scoped_by_kind() {
        let post = VoteLedger::key(&TargetRef::post("t1"), "u1");
        let comment = VoteLedger::key(&TargetRef::comment("t1"), "u1");
        assert_eq!(post.collection, Collection::PostVotes);
        assert_eq!(comment.collection, Collection::CommentVotes);
        assert_eq!(post.id, "t1|u1");
    }

    #[test]
    fn test_separator_in_ids_is_rejected() {
        assert!(validate_id("user", "a|b").is_err());
        assert!(validate_id("user", "").is_err());
        assert!(validate_id("user", "uid-123_x").is_ok());
    }

    #[test]
    fn test_no_vote_deletes_the_record() {
        let target = TargetRef::post("p1");
        let key = VoteLedger::key(&target, "u1");
        let write = VoteLedger::write_for(key.clone(), &target, "u1", VoteState::NoVote, Utc::now()).unwrap();
        assert_eq!(write, Write::delete(key));
    }

    #[tokio::test]
    async fn test_current_vote_surfaces_outages() {
        let mem = Arc::new(MemoryStore::new());
        let ledger = VoteLedger::new(mem.clone(), RetryPolicy::new(2, std::time::Duration::from_millis(1)));
        let target = TargetRef::post("p1");
        assert_eq!(ledger.current_vote(&target, "u1").await.unwrap(), None);
        mem.set_available(false);
        assert!(matches!(
            ledger.current_vote(&target, "u1").await,
            Err(CredenceError::StoreUnavailable(_))
        ));
    }
}
