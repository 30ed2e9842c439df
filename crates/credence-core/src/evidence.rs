// crates/credence-core/src/evidence.rs
//
// Cross-check evidence supplied by the external fact-checking collaborator.
// Treated as opaque, already-validated input.

use serde::{Deserialize, Serialize};

/// One cited source in a cross-check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

impl SourceCitation {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Finalized cross-check result for one analyzed URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCheckResult {
    #[serde(default)]
    pub supporting_sources: Vec<SourceCitation>,
    #[serde(default)]
    pub contradicting_sources: Vec<SourceCitation>,
}

impl CrossCheckResult {
    /// Total number of cited sources across both lists.
    pub fn cited_count(&self) -> usize {
        self.supporting_sources.len() + self.contradicting_sources.len()
    }
}
