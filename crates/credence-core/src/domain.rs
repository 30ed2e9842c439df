// crates/credence-core/src/domain.rs
//
// Domain key normalization and the public credibility view.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CredenceError;

/// Normalize a URL into its domain key.
///
/// Lowercase host with a leading `www.` stripped. Input without a parseable
/// host (e.g. `example.com/path` with no scheme) is used as-is, lowercased.
pub fn extract_domain(input: &str) -> Result<String, CredenceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CredenceError::InvalidArgument("empty URL".to_string()));
    }

    let raw = match Url::parse(trimmed) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    };

    let lower = raw.to_lowercase();
    let domain = lower.strip_prefix("www.").unwrap_or(&lower).to_string();
    if domain.is_empty() {
        return Err(CredenceError::InvalidArgument(format!(
            "no domain in URL {:?}",
            input
        )));
    }
    Ok(domain)
}

/// Whether the URL uses the `https` scheme. Unparseable input is not HTTPS.
pub fn is_https_url(input: &str) -> bool {
    Url::parse(input.trim())
        .map(|u| u.scheme() == "https")
        .unwrap_or(false)
}

/// Sub-score breakdown exposed by `getOrCreateDomainScore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: i64,
    pub https_score: i64,
    pub analysis_score: i64,
    pub community_score: i64,
}

/// Raw signal counters behind the sub-scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMetadata {
    pub is_https: bool,
    pub total_analyses: u64,
    pub supporting_count: u64,
    pub contradicting_count: u64,
    pub community_upvotes: u64,
    pub community_downvotes: u64,
}

/// Read-only credibility view of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCredibility {
    pub domain: String,
    pub total_score: i64,
    pub breakdown: ScoreBreakdown,
    pub metadata: DomainMetadata,
}
