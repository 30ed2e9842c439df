// crates/credence-community/src/aggregator.rs
//
// VoteAggregator: applies the vote state machine to posts and comments.
//
// A vote is two logically separate steps:
//
//   1. One transaction over {target, ledger record}: read the current vote,
//      apply the transition table, write the target's counters and the
//      ledger record together. Both land or neither does.
//   2. For posts bound to a URL, hand the committed delta to the domain
//      score sink as a `VoteApplied` event.
//
// Step 2 failing does not undo step 1. The caller gets
// `VoteOutcome::DomainStale` instead of a full success.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use credence_core::document::{DocKey, Write};
use credence_core::domain::DomainCredibility;
use credence_core::error::CredenceError;
use credence_core::events::VoteApplied;
use credence_core::traits::{DocumentStore, VoteEventSink};
use credence_core::vote::{TargetKind, TargetRef, VoteType};
use credence_store::{run_transaction, RetryPolicy, TxnPlan};

use crate::ledger::{validate_id, VoteLedger};
use crate::models::{CommentRecord, PostRecord, Votable};

/// Capacity of the committed-vote broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Target counters and the voter's state after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: u64,
    pub downvotes: u64,
    pub current_user_vote: Option<VoteType>,
}

/// Result of a committed vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// Vote recorded; the domain score (if any) is current.
    Complete {
        tally: VoteTally,
        domain_credibility: Option<DomainCredibility>,
    },
    /// Vote recorded, but propagating it to the domain score failed.
    DomainStale {
        tally: VoteTally,
        domain_url: String,
        error: String,
    },
}

impl VoteOutcome {
    pub fn tally(&self) -> &VoteTally {
        match self {
            VoteOutcome::Complete { tally, .. } | VoteOutcome::DomainStale { tally, .. } => tally,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, VoteOutcome::DomainStale { .. })
    }

    /// Updated domain total, when one was propagated.
    pub fn domain_score(&self) -> Option<i64> {
        match self {
            VoteOutcome::Complete {
                domain_credibility: Some(view),
                ..
            } => Some(view.total_score),
            _ => None,
        }
    }
}

/// Applies votes and publishes committed vote events.
#[derive(Clone)]
pub struct VoteAggregator {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
    sink: Option<Arc<dyn VoteEventSink>>,
    events: broadcast::Sender<VoteApplied>,
}

impl VoteAggregator {
    /// Create an aggregator with no domain sink. Post votes then only move
    /// post counters.
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            policy,
            sink: None,
            events,
        }
    }

    /// Propagate post votes to a domain score sink.
    pub fn with_sink(mut self, sink: Arc<dyn VoteEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Subscribe to committed vote events.
    pub fn subscribe(&self) -> broadcast::Receiver<VoteApplied> {
        self.events.subscribe()
    }

    /// Stringly-typed entry point: validates `vote_type` and `target_kind`
    /// before any read or write.
    pub async fn cast_vote(
        &self,
        target_id: &str,
        user_id: &str,
        vote_type: &str,
        target_kind: &str,
    ) -> Result<VoteOutcome, CredenceError> {
        let vote: VoteType = vote_type.parse()?;
        let kind: TargetKind = target_kind.parse()?;
        let target = TargetRef {
            kind,
            id: target_id.to_string(),
        };
        self.cast(&target, user_id, vote).await
    }

    /// Apply `vote` by `user_id` to `target`.
    pub async fn cast(
        &self,
        target: &TargetRef,
        user_id: &str,
        vote: VoteType,
    ) -> Result<VoteOutcome, CredenceError> {
        validate_id(target.kind.as_str(), &target.id)?;
        validate_id("user", user_id)?;

        let (tally, event) = match target.kind {
            TargetKind::Post => self.commit_vote::<PostRecord>(target, user_id, vote).await?,
            TargetKind::Comment => self.commit_vote::<CommentRecord>(target, user_id, vote).await?,
        };

        match self.events.send(event.clone()) {
            Ok(receivers) => {
                tracing::debug!(target_id = %target.id, receivers, "published vote event")
            }
            Err(_) => tracing::debug!(target_id = %target.id, "no vote event subscribers"),
        }

        Ok(self.propagate(tally, &event).await)
    }

    async fn commit_vote<T>(
        &self,
        target: &TargetRef,
        user_id: &str,
        vote: VoteType,
    ) -> Result<(VoteTally, VoteApplied), CredenceError>
    where
        T: Votable + Serialize + DeserializeOwned,
    {
        let target_key = DocKey::new(target.kind.target_collection(), target.id.as_str());
        let ledger_key = VoteLedger::key(target, user_id);
        let keys = [target_key.clone(), ledger_key.clone()];

        run_transaction(self.store.as_ref(), &self.policy, &keys, |snapshot| {
            let mut record: T = snapshot
                .decode(&target_key)?
                .ok_or_else(|| CredenceError::NotFound(format!("{} {}", target.kind, target.id)))?;

            let current = VoteLedger::state_in(snapshot, &ledger_key)?;
            let transition = current.transition(vote);

            let (up, down) = record.counters();
            let (up, down) = transition.delta.apply(up, down);
            record.set_counters(up, down);

            let writes = vec![
                Write::put(target_key.clone(), &record)?,
                VoteLedger::write_for(ledger_key.clone(), target, user_id, transition.next, Utc::now())?,
            ];
            let tally = VoteTally {
                upvotes: up,
                downvotes: down,
                current_user_vote: transition.next.vote(),
            };
            let event = VoteApplied {
                target: target.clone(),
                user_id: user_id.to_string(),
                domain_url: record.domain_url().map(str::to_string),
                delta: transition.delta,
            };
            Ok(TxnPlan::new(writes, (tally, event)))
        })
        .await
    }

    async fn propagate(&self, tally: VoteTally, event: &VoteApplied) -> VoteOutcome {
        let (sink, url) = match (&self.sink, event.domain_url.as_deref()) {
            (Some(sink), Some(url)) if event.affects_domain() => (sink, url),
            _ => {
                return VoteOutcome::Complete {
                    tally,
                    domain_credibility: None,
                }
            }
        };

        match sink.on_vote_applied(event).await {
            Ok(view) => VoteOutcome::Complete {
                tally,
                domain_credibility: Some(view),
            },
            Err(e) => {
                tracing::warn!(
                    target_id = %event.target.id,
                    url,
                    error = %e,
                    "vote recorded but domain score update failed"
                );
                VoteOutcome::DomainStale {
                    tally,
                    domain_url: url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use async_trait::async_trait;
    use credence_core::evidence::CrossCheckResult;
    use credence_core::vote::{VoteState, VoteType::*};
    use credence_scoring::DomainScoreStore;
    use credence_store::MemoryStore;
    use proptest::prelude::*;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    async fn seed_post(store: &MemoryStore, id: &str, url: Option<&str>) {
        let post = PostRecord {
            id: id.into(),
            analysis_id: format!("analysis-{}", id),
            author: Author::new("author"),
            url: url.map(str::to_string),
            title: None,
            summary: None,
            verdict: None,
            cross_check: CrossCheckResult::default(),
            domain_credibility: None,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            created_at: Utc::now(),
        };
        let key = DocKey::new(credence_core::Collection::CommunityPosts, id);
        store.commit(&[], &[Write::put(key, &post).unwrap()]).await.unwrap();
    }

    async fn seed_comment(store: &MemoryStore, id: &str) {
        let comment = CommentRecord {
            id: id.into(),
            post_id: "p1".into(),
            author: Author::new("author"),
            content: "hi".into(),
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now(),
        };
        let key = DocKey::new(credence_core::Collection::PostComments, id);
        store.commit(&[], &[Write::put(key, &comment).unwrap()]).await.unwrap();
    }

    fn counts(outcome: &VoteOutcome) -> (u64, u64, Option<VoteType>) {
        let t = outcome.tally();
        (t.upvotes, t.downvotes, t.current_user_vote)
    }

    struct FailingSink;

    #[async_trait]
    impl VoteEventSink for FailingSink {
        async fn on_vote_applied(&self, _event: &VoteApplied) -> Result<DomainCredibility, CredenceError> {
            Err(CredenceError::StoreUnavailable("domain store down".into()))
        }
    }

    #[tokio::test]
    async fn test_vote_flip_scenario() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", None).await;
        let agg = VoteAggregator::new(mem.clone(), policy());
        let target = TargetRef::post("p1");

        let o = agg.cast(&target, "u1", Upvote).await.unwrap();
        assert_eq!(counts(&o), (1, 0, Some(Upvote)));
        let o = agg.cast(&target, "u1", Downvote).await.unwrap();
        assert_eq!(counts(&o), (0, 1, Some(Downvote)));
        let o = agg.cast(&target, "u1", Downvote).await.unwrap();
        assert_eq!(counts(&o), (0, 0, None));

        let ledger = VoteLedger::new(mem.clone(), policy());
        assert_eq!(ledger.current_vote(&target, "u1").await.unwrap(), None);
        assert!(mem.get(&VoteLedger::key(&target, "u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_vote_twice_toggles_off() {
        let mem = Arc::new(MemoryStore::new());
        seed_comment(&mem, "c1").await;
        let agg = VoteAggregator::new(mem.clone(), policy());
        agg.cast_vote("c1", "u1", "upvote", "comment").await.unwrap();
        let o = agg.cast_vote("c1", "u1", "upvote", "comment").await.unwrap();
        assert_eq!(counts(&o), (0, 0, None));
    }

    #[tokio::test]
    async fn test_invalid_vote_type_writes_nothing() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", None).await;
        let agg = VoteAggregator::new(mem.clone(), policy());
        let before = mem.len();
        let err = agg.cast_vote("p1", "u1", "superlike", "post").await.unwrap_err();
        assert!(matches!(err, CredenceError::InvalidArgument(_)));
        let err = agg.cast_vote("p1", "u1", "upvote", "thread").await.unwrap_err();
        assert!(matches!(err, CredenceError::InvalidArgument(_)));
        assert_eq!(mem.len(), before);
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let mem = Arc::new(MemoryStore::new());
        let agg = VoteAggregator::new(mem.clone(), policy());
        let err = agg.cast(&TargetRef::post("nope"), "u1", Upvote).await.unwrap_err();
        assert!(matches!(err, CredenceError::NotFound(_)));
        assert!(mem.is_empty());
    }

    #[tokio::test]
    async fn test_post_vote_propagates_to_domain() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", Some("https://example.com/story")).await;
        let domains = Arc::new(DomainScoreStore::new(mem.clone(), policy()));
        let agg = VoteAggregator::new(mem.clone(), policy()).with_sink(domains.clone());
        let target = TargetRef::post("p1");

        let o = agg.cast(&target, "u1", Downvote).await.unwrap();
        assert_eq!(o.domain_score(), Some(59));
        let o = agg.cast(&target, "u1", Upvote).await.unwrap();
        assert_eq!(o.domain_score(), Some(61));
        assert!(!o.is_degraded());

        let record = domains.get("example.com").await.unwrap();
        assert_eq!(record.community_upvotes(), 1);
        assert_eq!(record.community_downvotes(), 0);
    }

    #[tokio::test]
    async fn test_comment_votes_do_not_touch_domains() {
        let mem = Arc::new(MemoryStore::new());
        seed_comment(&mem, "c1").await;
        let agg = VoteAggregator::new(mem.clone(), policy()).with_sink(Arc::new(FailingSink));
        let o = agg.cast(&TargetRef::comment("c1"), "u1", Upvote).await.unwrap();
        assert!(!o.is_degraded());
        assert_eq!(o.domain_score(), None);
    }

    #[tokio::test]
    async fn test_sink_failure_reports_domain_stale() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", Some("https://example.com/story")).await;
        let agg = VoteAggregator::new(mem.clone(), policy()).with_sink(Arc::new(FailingSink));

        let o = agg.cast(&TargetRef::post("p1"), "u1", Upvote).await.unwrap();
        assert!(o.is_degraded());
        assert_eq!(counts(&o), (1, 0, Some(Upvote)));
        match o {
            VoteOutcome::DomainStale { domain_url, error, .. } => {
                assert_eq!(domain_url, "https://example.com/story");
                assert!(error.contains("domain store down"));
            }
            other => panic!("expected DomainStale, got {:?}", other),
        }

        // The vote itself stays committed.
        let ledger = VoteLedger::new(mem.clone(), policy());
        assert_eq!(
            ledger.current_vote(&TargetRef::post("p1"), "u1").await.unwrap(),
            Some(Upvote)
        );
    }

    #[tokio::test]
    async fn test_committed_votes_are_broadcast() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", Some("http://example.com")).await;
        let agg = VoteAggregator::new(mem.clone(), policy());
        let mut rx = agg.subscribe();
        agg.cast(&TargetRef::post("p1"), "u1", Upvote).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.target, TargetRef::post("p1"));
        assert_eq!(event.domain_url.as_deref(), Some("http://example.com"));
        assert_eq!(event.delta, credence_core::VoteDelta::new(1, 0));
    }

    #[tokio::test]
    async fn test_vote_commits_with_no_subscribers() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", None).await;
        let agg = VoteAggregator::new(mem.clone(), policy());
        let rx = agg.subscribe();
        drop(rx);

        let o = agg.cast(&TargetRef::post("p1"), "u1", Upvote).await.unwrap();
        assert_eq!(counts(&o), (1, 0, Some(Upvote)));

        // A subscriber that joins later sees only later events.
        let mut late = agg.subscribe();
        agg.cast(&TargetRef::post("p1"), "u2", Upvote).await.unwrap();
        assert_eq!(late.recv().await.unwrap().user_id, "u2");
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_outage_fails_before_commit() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", None).await;
        let agg = VoteAggregator::new(mem.clone(), policy());
        mem.set_available(false);
        let err = agg.cast(&TargetRef::post("p1"), "u1", Upvote).await.unwrap_err();
        assert!(matches!(err, CredenceError::StoreUnavailable(_)));
        mem.set_available(true);
        let ledger = VoteLedger::new(mem.clone(), policy());
        assert_eq!(ledger.current_vote(&TargetRef::post("p1"), "u1").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_voters_no_lost_update() {
        let mem = Arc::new(MemoryStore::new());
        seed_post(&mem, "p1", Some("https://example.com")).await;
        let domains = Arc::new(DomainScoreStore::new(mem.clone(), RetryPolicy::new(64, Duration::from_millis(1))));
        let agg = VoteAggregator::new(mem.clone(), RetryPolicy::new(64, Duration::from_millis(1)))
            .with_sink(domains.clone());

        let mut handles = Vec::new();
        for i in 0..12 {
            let agg = agg.clone();
            handles.push(tokio::spawn(async move {
                agg.cast(&TargetRef::post("p1"), &format!("user{}", i), Upvote).await
            }));
        }
        for h in handles {
            assert!(!h.await.unwrap().unwrap().is_degraded());
        }

        let doc = mem
            .get(&DocKey::new(credence_core::Collection::CommunityPosts, "p1"))
            .await
            .unwrap()
            .unwrap();
        let post: PostRecord = doc.decode().unwrap();
        assert_eq!(post.upvotes, 12);
        assert_eq!(domains.get("example.com").await.unwrap().community_upvotes(), 12);
    }

    fn vote_strategy() -> impl Strategy<Value = VoteType> {
        prop_oneof![Just(Upvote), Just(Downvote)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_vote_sequences_match_transition_table(
            votes in proptest::collection::vec((0usize..3, vote_strategy()), 1..24)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let mem = Arc::new(MemoryStore::new());
                seed_post(&mem, "p1", None).await;
                let agg = VoteAggregator::new(mem.clone(), policy());
                let target = TargetRef::post("p1");

                let mut states = [VoteState::NoVote; 3];
                let (mut up, mut down) = (0u64, 0u64);
                for (user, vote) in &votes {
                    let t = states[*user].transition(*vote);
                    states[*user] = t.next;
                    let (u, d) = t.delta.apply(up, down);
                    up = u;
                    down = d;

                    let o = agg.cast(&target, &format!("u{}", user), *vote).await.unwrap();
                    assert_eq!(counts(&o), (up, down, t.next.vote()));
                }

                let ledger = VoteLedger::new(mem.clone(), policy());
                for (user, state) in states.iter().enumerate() {
                    let stored = ledger.current_vote(&target, &format!("u{}", user)).await.unwrap();
                    assert_eq!(stored, state.vote());
                }
            });
        }
    }
}
