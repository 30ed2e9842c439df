// crates/credence-scoring/src/domain_store.rs
//
// DomainScoreStore: single source of truth for domain credibility.
//
// Records are created lazily through the store's atomic create-if-absent
// primitive and every mutation is an optimistic read-modify-write of the one
// domain key, so updates to different domains never wait on each other.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use credence_core::document::{Collection, DocKey, Write};
use credence_core::domain::{extract_domain, is_https_url, DomainCredibility};
use credence_core::error::CredenceError;
use credence_core::events::VoteApplied;
use credence_core::traits::{DocumentStore, VoteEventSink};
use credence_core::vote::VoteDelta;
use credence_store::{run_transaction, with_retry, RetryPolicy, TxnPlan};

use crate::record::DomainScoreRecord;

/// One row of the top-domains ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainRanking {
    pub domain: String,
    pub total_score: i64,
    pub total_analyses: u64,
    pub is_https: bool,
}

impl From<&DomainScoreRecord> for DomainRanking {
    fn from(record: &DomainScoreRecord) -> Self {
        Self {
            domain: record.domain().to_string(),
            total_score: record.total_score(),
            total_analyses: record.total_analyses(),
            is_https: record.is_https(),
        }
    }
}

/// Keyed domain score records over a transactional document store.
#[derive(Clone)]
pub struct DomainScoreStore {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

fn domain_key(domain: &str) -> DocKey {
    DocKey::new(Collection::DomainCredibility, domain)
}

impl DomainScoreStore {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Get the record for the URL's domain, creating it if unseen.
    ///
    /// A new record takes its HTTPS score from this URL's scheme; an existing
    /// record is returned untouched whatever the scheme.
    pub async fn get_or_create(&self, url: &str) -> Result<DomainScoreRecord, CredenceError> {
        let domain = extract_domain(url)?;
        let key = domain_key(&domain);
        let fresh = DomainScoreRecord::new(domain.as_str(), is_https_url(url), Utc::now());
        let body = serde_json::to_value(&fresh)?;

        let (doc, created) = with_retry(&self.policy, || {
            self.store.create_if_absent(&key, body.clone())
        })
        .await?;
        if created {
            tracing::info!(domain = %domain, https = fresh.is_https(), "created domain score record");
        }
        DomainScoreRecord::from_document(&doc)
    }

    /// Read an existing record by domain name or URL. `NotFound` if unseen.
    ///
    /// The input goes through the same normalization as `get_or_create`, so
    /// `WWW.Example.com` and `https://example.com/x` find `example.com`.
    pub async fn get(&self, domain: &str) -> Result<DomainScoreRecord, CredenceError> {
        let domain = extract_domain(domain)?;
        let key = domain_key(&domain);
        let doc = with_retry(&self.policy, || self.store.get(&key))
            .await?
            .ok_or_else(|| CredenceError::NotFound(format!("domain {}", domain)))?;
        DomainScoreRecord::from_document(&doc)
    }

    /// Credibility view for a URL's domain, creating the record if unseen.
    pub async fn credibility(&self, url: &str) -> Result<DomainCredibility, CredenceError> {
        Ok(self.get_or_create(url).await?.credibility())
    }

    /// Highest-scoring domains first, at most `limit`. Ties order by domain.
    pub async fn top_domains(&self, limit: usize) -> Result<Vec<DomainRanking>, CredenceError> {
        let docs = with_retry(&self.policy, || self.store.list(Collection::DomainCredibility)).await?;
        let mut records = docs
            .iter()
            .map(|(_, doc)| DomainScoreRecord::from_document(doc))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| {
            b.total_score()
                .cmp(&a.total_score())
                .then_with(|| a.domain().cmp(b.domain()))
        });
        records.truncate(limit);
        Ok(records.iter().map(DomainRanking::from).collect())
    }

    /// Atomically add evidence counts to the URL's domain.
    ///
    /// `count_analysis` bumps `total_analyses` by one and is set only for the
    /// primary domain of an analysis, never for cited sources.
    pub async fn apply_analysis_delta(
        &self,
        url: &str,
        supporting: u64,
        contradicting: u64,
        count_analysis: bool,
    ) -> Result<DomainScoreRecord, CredenceError> {
        let domain = self.get_or_create(url).await?.domain().to_string();
        self.update(&domain, |record| {
            record.apply_analysis(supporting, contradicting, count_analysis, Utc::now())
        })
        .await
    }

    /// Atomically apply a signed community vote delta to the URL's domain.
    pub async fn apply_vote_delta(
        &self,
        url: &str,
        delta: VoteDelta,
    ) -> Result<DomainScoreRecord, CredenceError> {
        let domain = self.get_or_create(url).await?.domain().to_string();
        self.update(&domain, |record| record.apply_votes(delta, Utc::now()))
            .await
    }

    async fn update<F>(&self, domain: &str, mut mutate: F) -> Result<DomainScoreRecord, CredenceError>
    where
        F: FnMut(&mut DomainScoreRecord) + Send,
    {
        let key = domain_key(domain);
        let keys = [key.clone()];
        run_transaction(self.store.as_ref(), &self.policy, &keys, |snapshot| {
            let doc = snapshot
                .get(&key)
                .ok_or_else(|| CredenceError::NotFound(format!("domain {}", domain)))?;
            let mut record = DomainScoreRecord::from_document(doc)?;
            mutate(&mut record);
            Ok(TxnPlan::new(vec![Write::put(key.clone(), &record)?], record))
        })
        .await
    }
}

#[async_trait]
impl VoteEventSink for DomainScoreStore {
    async fn on_vote_applied(&self, event: &VoteApplied) -> Result<DomainCredibility, CredenceError> {
        let url = event.domain_url.as_deref().ok_or_else(|| {
            CredenceError::InvalidArgument(format!("{} {} is not bound to a URL", event.target.kind, event.target.id))
        })?;
        let record = self.apply_vote_delta(url, event.delta).await?;
        tracing::debug!(
            domain = record.domain(),
            upvotes = event.delta.upvotes,
            downvotes = event.delta.downvotes,
            total = record.total_score(),
            "applied vote delta to domain"
        );
        Ok(record.credibility())
    }
}
