// crates/credence-scoring/src/analysis.rs
//
// AnalysisAggregator: folds a finalized cross-check result into domain scores.
//
// One analysis fans out into 1 + N independent domain updates: the primary
// domain takes the full evidence counts and one analysis, then every cited
// source's domain takes +1 supporting or +1 contradicting. Each update is
// atomic on its own; the group is not. A failed source update is logged and
// reported, never retried or rolled back, and never undoes the primary update.

use std::sync::Arc;

use serde::Serialize;

use credence_core::error::CredenceError;
use credence_core::evidence::{CrossCheckResult, SourceCitation};

use crate::domain_store::DomainScoreStore;
use crate::record::DomainScoreRecord;

/// Which evidence list a citation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Supporting,
    Contradicting,
}

/// A cited source whose domain update failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSource {
    pub url: String,
    pub stance: Stance,
    pub error: String,
}

/// Outcome of folding one analysis into the domain scores.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Primary domain after the update.
    pub primary: DomainScoreRecord,
    /// Domains of cited sources that were updated, in citation order.
    pub updated_sources: Vec<String>,
    /// Cited sources skipped for having no URL.
    pub skipped_sources: usize,
    /// Cited sources whose update failed.
    pub failed_sources: Vec<FailedSource>,
}

impl AnalysisReport {
    /// True when every cited source with a URL was applied.
    pub fn is_complete(&self) -> bool {
        self.failed_sources.is_empty()
    }
}

/// Applies cross-check evidence to the primary and cited domains.
#[derive(Clone)]
pub struct AnalysisAggregator {
    domains: Arc<DomainScoreStore>,
}

impl AnalysisAggregator {
    pub fn new(domains: Arc<DomainScoreStore>) -> Self {
        Self { domains }
    }

    /// Record the cross-check result for `url`.
    ///
    /// Fails only if the primary domain update fails. Source failures are
    /// returned in `AnalysisReport::failed_sources`.
    pub async fn record_analysis(
        &self,
        url: &str,
        result: &CrossCheckResult,
    ) -> Result<AnalysisReport, CredenceError> {
        let supporting = result.supporting_sources.len() as u64;
        let contradicting = result.contradicting_sources.len() as u64;
        let primary = self
            .domains
            .apply_analysis_delta(url, supporting, contradicting, true)
            .await?;

        tracing::info!(
            domain = primary.domain(),
            supporting,
            contradicting,
            total = primary.total_score(),
            "recorded analysis"
        );

        let mut report = AnalysisReport {
            primary,
            updated_sources: Vec::with_capacity(result.cited_count()),
            skipped_sources: 0,
            failed_sources: Vec::new(),
        };

        let cited = result
            .supporting_sources
            .iter()
            .map(|s| (s, Stance::Supporting))
            .chain(
                result
                    .contradicting_sources
                    .iter()
                    .map(|s| (s, Stance::Contradicting)),
            );
        for (source, stance) in cited {
            self.apply_source(source, stance, &mut report).await;
        }

        if !report.is_complete() {
            tracing::warn!(
                domain = report.primary.domain(),
                failed = report.failed_sources.len(),
                "analysis fan-out left source domains unapplied"
            );
        }
        Ok(report)
    }

    async fn apply_source(&self, source: &SourceCitation, stance: Stance, report: &mut AnalysisReport) {
        if source.url.trim().is_empty() {
            report.skipped_sources += 1;
            return;
        }
        let (supporting, contradicting) = match stance {
            Stance::Supporting => (1, 0),
            Stance::Contradicting => (0, 1),
        };
        match self
            .domains
            .apply_analysis_delta(&source.url, supporting, contradicting, false)
            .await
        {
            Ok(record) => report.updated_sources.push(record.domain().to_string()),
            Err(e) => {
                tracing::warn!(url = %source.url, error = %e, "failed to update cited source domain");
                report.failed_sources.push(FailedSource {
                    url: source.url.clone(),
                    stance,
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credence_store::{MemoryStore, RetryPolicy};
    use std::time::Duration;

    fn setup() -> (Arc<DomainScoreStore>, AnalysisAggregator) {
        let mem = Arc::new(MemoryStore::new());
        let domains = Arc::new(DomainScoreStore::new(
            mem,
            RetryPolicy::new(3, Duration::from_millis(1)),
        ));
        (domains.clone(), AnalysisAggregator::new(domains))
    }

    fn cite(url: &str) -> SourceCitation {
        SourceCitation::new("title", url, "snippet")
    }

    #[tokio::test]
    async fn test_fresh_https_domain_scores_61() {
        let (_domains, agg) = setup();
        let result = CrossCheckResult {
            supporting_sources: vec![cite("https://a.org/1"), cite("https://b.org/2")],
            contradicting_sources: vec![cite("http://c.net/3")],
        };
        let report = agg.record_analysis("https://news.example.com/story", &result).await.unwrap();
        let p = &report.primary;
        assert_eq!(p.supporting_count(), 2);
        assert_eq!(p.contradicting_count(), 1);
        assert_eq!(p.total_analyses(), 1);
        assert_eq!(p.analysis_score(), 1);
        assert_eq!(p.total_score(), 61);
        assert!(report.is_complete());
        assert_eq!(report.updated_sources, vec!["a.org", "b.org", "c.net"]);
    }

    #[tokio::test]
    async fn test_cited_sources_get_single_increments() {
        let (domains, agg) = setup();
        let result = CrossCheckResult {
            supporting_sources: vec![cite("https://a.org/1"), cite("https://a.org/2")],
            contradicting_sources: vec![cite("http://c.net/3")],
        };
        agg.record_analysis("https://example.com", &result).await.unwrap();

        let a = domains.get("a.org").await.unwrap();
        assert_eq!((a.supporting_count(), a.contradicting_count()), (2, 0));
        assert_eq!(a.total_analyses(), 0);
        assert_eq!(a.total_score(), 64);

        let c = domains.get("c.net").await.unwrap();
        assert_eq!((c.supporting_count(), c.contradicting_count()), (0, 1));
        assert_eq!(c.total_score(), 47);
    }

    #[tokio::test]
    async fn test_repeated_analyses_accumulate() {
        let (domains, agg) = setup();
        let result = CrossCheckResult {
            supporting_sources: vec![cite("https://a.org/1")],
            contradicting_sources: vec![],
        };
        agg.record_analysis("https://example.com/1", &result).await.unwrap();
        agg.record_analysis("https://example.com/2", &result).await.unwrap();
        let p = domains.get("example.com").await.unwrap();
        assert_eq!(p.total_analyses(), 2);
        assert_eq!(p.supporting_count(), 2);
    }

    #[tokio::test]
    async fn test_source_failures_are_reported_not_fatal() {
        let (domains, agg) = setup();
        let result = CrossCheckResult {
            supporting_sources: vec![cite(""), cite("www."), cite("https://ok.org")],
            contradicting_sources: vec![],
        };
        let report = agg.record_analysis("https://example.com", &result).await.unwrap();
        assert_eq!(report.skipped_sources, 1);
        assert_eq!(report.updated_sources, vec!["ok.org"]);
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].url, "www.");
        assert!(!report.is_complete());
        // Primary counts every cited source, including skipped ones.
        assert_eq!(domains.get("example.com").await.unwrap().supporting_count(), 3);
    }

    #[tokio::test]
    async fn test_primary_failure_is_an_error() {
        let (_domains, agg) = setup();
        let err = agg
            .record_analysis("", &CrossCheckResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CredenceError::InvalidArgument(_)));
    }
}
