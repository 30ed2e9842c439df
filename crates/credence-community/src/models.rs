// crates/credence-community/src/models.rs
//
// Fixed-schema records for the community collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credence_core::evidence::CrossCheckResult;
use credence_core::vote::VoteType;

/// Identity of the acting user, as supplied by the (external) auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            picture: None,
        }
    }
}

/// A saved analysis of one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub cross_check: CrossCheckResult,
    /// Domain total score at the time of the analysis.
    #[serde(default)]
    pub domain_credibility: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input for saving an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub cross_check: CrossCheckResult,
    #[serde(default)]
    pub domain_credibility: Option<i64>,
}

/// An analysis shared to the community feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub analysis_id: String,
    pub author: Author,
    /// URL the post is bound to; votes on the post move this URL's domain.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub cross_check: CrossCheckResult,
    #[serde(default)]
    pub domain_credibility: Option<i64>,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub downvotes: u64,
    #[serde(default)]
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub author: Author,
    pub content: String,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub downvotes: u64,
    pub created_at: DateTime<Utc>,
}

/// One user's active vote on one target. Absent record means no vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub target_id: String,
    pub user_id: String,
    pub vote_type: VoteType,
    pub updated_at: DateTime<Utc>,
}

/// A record with up/down counters.
pub trait Votable {
    fn counters(&self) -> (u64, u64);
    fn set_counters(&mut self, upvotes: u64, downvotes: u64);
    /// URL whose domain a vote should propagate to.
    fn domain_url(&self) -> Option<&str>;
}

impl Votable for PostRecord {
    fn counters(&self) -> (u64, u64) {
        (self.upvotes, self.downvotes)
    }

    fn set_counters(&mut self, upvotes: u64, downvotes: u64) {
        self.upvotes = upvotes;
        self.downvotes = downvotes;
    }

    fn domain_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

impl Votable for CommentRecord {
    fn counters(&self) -> (u64, u64) {
        (self.upvotes, self.downvotes)
    }

    fn set_counters(&mut self, upvotes: u64, downvotes: u64) {
        self.upvotes = upvotes;
        self.downvotes = downvotes;
    }

    fn domain_url(&self) -> Option<&str> {
        None
    }
}

/// A post together with the viewer's current vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostRecord,
    pub user_vote: Option<VoteType>,
}

/// A comment together with the viewer's current vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub user_vote: Option<VoteType>,
}
