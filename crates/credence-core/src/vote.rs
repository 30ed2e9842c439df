// crates/credence-core/src/vote.rs
//
// Per-(target, user) vote state machine.
//
//   current    requested   next        counter delta
//   NoVote     upvote      Upvoted     +1 up
//   NoVote     downvote    Downvoted   +1 down
//   Upvoted    upvote      NoVote      -1 up
//   Upvoted    downvote    Downvoted   -1 up, +1 down
//   Downvoted  downvote    NoVote      -1 down
//   Downvoted  upvote      Upvoted     -1 down, +1 up
//
// Casting the same vote twice removes it; casting the opposite vote flips it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Collection;
use crate::error::CredenceError;

/// A requested or recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Upvote => "upvote",
            VoteType::Downvote => "downvote",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = CredenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteType::Upvote),
            "downvote" => Ok(VoteType::Downvote),
            other => Err(CredenceError::InvalidArgument(format!(
                "vote type must be \"upvote\" or \"downvote\", got {:?}",
                other
            ))),
        }
    }
}

/// Signed change to a target's (or domain's) up/down counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteDelta {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteDelta {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }

    pub fn is_zero(&self) -> bool {
        self.upvotes == 0 && self.downvotes == 0
    }

    /// Net effect on a community score: up minus down.
    pub fn net(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    /// Apply the delta to a pair of counters, saturating at zero.
    pub fn apply(&self, upvotes: u64, downvotes: u64) -> (u64, u64) {
        (
            apply_signed(upvotes, self.upvotes),
            apply_signed(downvotes, self.downvotes),
        )
    }
}

fn apply_signed(counter: u64, delta: i64) -> u64 {
    if delta >= 0 {
        counter.saturating_add(delta.unsigned_abs())
    } else {
        counter.saturating_sub(delta.unsigned_abs())
    }
}

/// Current vote of one user on one target. Absence of a ledger record is `NoVote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteState {
    NoVote,
    Upvoted,
    Downvoted,
}

impl From<Option<VoteType>> for VoteState {
    fn from(vote: Option<VoteType>) -> Self {
        match vote {
            None => VoteState::NoVote,
            Some(VoteType::Upvote) => VoteState::Upvoted,
            Some(VoteType::Downvote) => VoteState::Downvoted,
        }
    }
}

/// Result of applying a requested vote to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: VoteState,
    pub delta: VoteDelta,
}

impl VoteState {
    /// The vote a ledger record should hold for this state.
    pub fn vote(&self) -> Option<VoteType> {
        match self {
            VoteState::NoVote => None,
            VoteState::Upvoted => Some(VoteType::Upvote),
            VoteState::Downvoted => Some(VoteType::Downvote),
        }
    }

    /// Apply the transition table.
    pub fn transition(self, requested: VoteType) -> Transition {
        let (next, upvotes, downvotes) = match (self, requested) {
            (VoteState::NoVote, VoteType::Upvote) => (VoteState::Upvoted, 1, 0),
            (VoteState::NoVote, VoteType::Downvote) => (VoteState::Downvoted, 0, 1),
            (VoteState::Upvoted, VoteType::Upvote) => (VoteState::NoVote, -1, 0),
            (VoteState::Upvoted, VoteType::Downvote) => (VoteState::Downvoted, -1, 1),
            (VoteState::Downvoted, VoteType::Downvote) => (VoteState::NoVote, 0, -1),
            (VoteState::Downvoted, VoteType::Upvote) => (VoteState::Upvoted, 1, -1),
        };
        Transition {
            next,
            delta: VoteDelta::new(upvotes, downvotes),
        }
    }
}

/// Kind of votable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    /// Collection holding the target records.
    pub fn target_collection(&self) -> Collection {
        match self {
            TargetKind::Post => Collection::CommunityPosts,
            TargetKind::Comment => Collection::PostComments,
        }
    }

    /// Collection holding the per-(target, user) vote ledger.
    pub fn ledger_collection(&self) -> Collection {
        match self {
            TargetKind::Post => Collection::PostVotes,
            TargetKind::Comment => Collection::CommentVotes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = CredenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(TargetKind::Post),
            "comment" => Ok(TargetKind::Comment),
            other => Err(CredenceError::InvalidArgument(format!(
                "target kind must be \"post\" or \"comment\", got {:?}",
                other
            ))),
        }
    }
}

/// A votable target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: String,
}

impl TargetRef {
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Post,
            id: id.into(),
        }
    }

    pub fn comment(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Comment,
            id: id.into(),
        }
    }
}
