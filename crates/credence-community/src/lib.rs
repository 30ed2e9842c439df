// crates/credence-community/src/lib.rs
//
// credence-community: Community feed, comments, saved analyses, and voting.
//
// Modules:
// - models: Stored record types for analyses, posts, comments, and votes.
// - ledger: Per-(target, user) vote records.
// - aggregator: Vote state machine over post/comment counters, with
//   propagation of post votes to domain scores.
// - analyses: Per-user analysis history.
// - posts: Sharing analyses to the feed and commenting on posts.

pub mod aggregator;
pub mod analyses;
pub mod ledger;
pub mod models;
pub mod posts;

pub use aggregator::{VoteAggregator, VoteOutcome, VoteTally};
pub use analyses::AnalysisHistory;
pub use ledger::VoteLedger;
pub use models::{
    AnalysisRecord, Author, CommentRecord, CommentView, NewAnalysis, PostRecord, PostView, VoteRecord,
};
pub use posts::CommunityBoard;
