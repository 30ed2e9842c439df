// crates/credence-scoring/src/record.rs
//
// Stored per-domain credibility record.
//
// Derived scores are private and only ever written by `recompute`, which
// every mutator calls before returning. Decoding from the store also
// recomputes, so a stored record is never trusted for its derived values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credence_core::document::Document;
use credence_core::domain::{DomainCredibility, DomainMetadata, ScoreBreakdown};
use credence_core::error::CredenceError;
use credence_core::vote::VoteDelta;

use crate::calculator;

/// A domain's signal counters and the scores derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainScoreRecord {
    domain: String,
    base_score: i64,
    /// Fixed at creation from the scheme of the first URL seen.
    https_score: i64,
    analysis_score: i64,
    community_score: i64,
    total_score: i64,
    is_https: bool,
    #[serde(default)]
    total_analyses: u64,
    #[serde(default)]
    supporting_count: u64,
    #[serde(default)]
    contradicting_count: u64,
    #[serde(default)]
    community_upvotes: u64,
    #[serde(default)]
    community_downvotes: u64,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl DomainScoreRecord {
    /// Fresh record: all counters zero, `total = 50 + https`.
    pub fn new(domain: impl Into<String>, is_https: bool, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            domain: domain.into(),
            base_score: calculator::BASE_SCORE,
            https_score: 0,
            analysis_score: 0,
            community_score: 0,
            total_score: 0,
            is_https,
            total_analyses: 0,
            supporting_count: 0,
            contradicting_count: 0,
            community_upvotes: 0,
            community_downvotes: 0,
            created_at: now,
            last_updated: now,
        };
        record.recompute();
        record
    }

    /// Decode a stored document, re-deriving every score from its counters.
    pub fn from_document(doc: &Document) -> Result<Self, CredenceError> {
        let mut record: Self = doc.decode()?;
        record.recompute();
        Ok(record)
    }

    fn recompute(&mut self) {
        self.base_score = calculator::BASE_SCORE;
        self.https_score = calculator::https_score(self.is_https);
        self.analysis_score =
            calculator::analysis_score(self.supporting_count, self.contradicting_count);
        self.community_score =
            calculator::community_score(self.community_upvotes, self.community_downvotes);
        self.total_score =
            calculator::total_score(self.https_score, self.analysis_score, self.community_score);
    }

    /// Add evidence counts. `count_analysis` bumps `total_analyses` by one.
    pub fn apply_analysis(
        &mut self,
        supporting: u64,
        contradicting: u64,
        count_analysis: bool,
        now: DateTime<Utc>,
    ) {
        self.supporting_count = self.supporting_count.saturating_add(supporting);
        self.contradicting_count = self.contradicting_count.saturating_add(contradicting);
        if count_analysis {
            self.total_analyses = self.total_analyses.saturating_add(1);
        }
        self.last_updated = now;
        self.recompute();
    }

    /// Apply a signed community vote delta, saturating counters at zero.
    pub fn apply_votes(&mut self, delta: VoteDelta, now: DateTime<Utc>) {
        let (up, down) = delta.apply(self.community_upvotes, self.community_downvotes);
        self.community_upvotes = up;
        self.community_downvotes = down;
        self.last_updated = now;
        self.recompute();
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn base_score(&self) -> i64 {
        self.base_score
    }

    pub fn https_score(&self) -> i64 {
        self.https_score
    }

    pub fn analysis_score(&self) -> i64 {
        self.analysis_score
    }

    pub fn community_score(&self) -> i64 {
        self.community_score
    }

    pub fn total_score(&self) -> i64 {
        self.total_score
    }

    pub fn is_https(&self) -> bool {
        self.is_https
    }

    pub fn total_analyses(&self) -> u64 {
        self.total_analyses
    }

    pub fn supporting_count(&self) -> u64 {
        self.supporting_count
    }

    pub fn contradicting_count(&self) -> u64 {
        self.contradicting_count
    }

    pub fn community_upvotes(&self) -> u64 {
        self.community_upvotes
    }

    pub fn community_downvotes(&self) -> u64 {
        self.community_downvotes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Public credibility view with breakdown and metadata.
    pub fn credibility(&self) -> DomainCredibility {
        DomainCredibility {
            domain: self.domain.clone(),
            total_score: self.total_score,
            breakdown: ScoreBreakdown {
                base_score: self.base_score,
                https_score: self.https_score,
                analysis_score: self.analysis_score,
                community_score: self.community_score,
            },
            metadata: DomainMetadata {
                is_https: self.is_https,
                total_analyses: self.total_analyses,
                supporting_count: self.supporting_count,
                contradicting_count: self.contradicting_count,
                community_upvotes: self.community_upvotes,
                community_downvotes: self.community_downvotes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_https_record() {
        let r = DomainScoreRecord::new("example.com", true, Utc::now());
        assert_eq!(r.https_score(), 10);
        assert_eq!(r.total_score(), 60);
        assert_eq!(r.total_analyses(), 0);
    }

    #[test]
    fn test_new_http_record() {
        let r = DomainScoreRecord::new("example.com", false, Utc::now());
        assert_eq!(r.total_score(), 50);
    }

    #[test]
    fn test_apply_analysis_recomputes_total() {
        let mut r = DomainScoreRecord::new("example.com", true, Utc::now());
        r.apply_analysis(2, 1, true, Utc::now());
        assert_eq!(r.supporting_count(), 2);
        assert_eq!(r.contradicting_count(), 1);
        assert_eq!(r.total_analyses(), 1);
        assert_eq!(r.analysis_score(), 1);
        assert_eq!(r.total_score(), 61);
    }

    #[test]
    fn test_source_update_does_not_count_analysis() {
        let mut r = DomainScoreRecord::new("example.com", false, Utc::now());
        r.apply_analysis(1, 0, false, Utc::now());
        assert_eq!(r.total_analyses(), 0);
        assert_eq!(r.total_score(), 52);
    }

    #[test]
    fn test_vote_flip_moves_community_score() {
        let mut r = DomainScoreRecord::new("example.com", false, Utc::now());
        r.apply_votes(VoteDelta::new(0, 1), Utc::now());
        assert_eq!(r.community_score(), -1);
        r.apply_votes(VoteDelta::new(1, -1), Utc::now());
        assert_eq!(r.community_upvotes(), 1);
        assert_eq!(r.community_downvotes(), 0);
        assert_eq!(r.community_score(), 1);
        assert_eq!(r.total_score(), 51);
    }

    #[test]
    fn test_decode_ignores_tampered_total() {
        let r = DomainScoreRecord::new("example.com", true, Utc::now());
        let mut body = serde_json::to_value(&r).unwrap();
        body["total_score"] = serde_json::json!(99);
        body["https_score"] = serde_json::json!(0);
        let doc = Document { version: 1, body };
        let decoded = DomainScoreRecord::from_document(&doc).unwrap();
        assert_eq!(decoded.total_score(), 60);
        assert_eq!(decoded.https_score(), 10);
    }

    #[test]
    fn test_credibility_view() {
        let r = DomainScoreRecord::new("example.com", true, Utc::now());
        let view = r.credibility();
        assert_eq!(view.domain, "example.com");
        assert_eq!(view.breakdown.base_score, 50);
        assert!(view.metadata.is_https);
    }
}
