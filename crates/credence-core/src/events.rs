// crates/credence-core/src/events.rs
//
// Events emitted once a vote transaction has committed.
//
// A vote on a post bound to a URL also moves that URL's domain community
// score. The vote side publishes the committed delta as a `VoteApplied`
// event; the scoring side consumes it through `VoteEventSink`.

use serde::{Deserialize, Serialize};

use crate::vote::{TargetRef, VoteDelta};

/// A committed vote transition on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteApplied {
    pub target: TargetRef,
    pub user_id: String,
    /// URL the target is bound to. Only posts carry one.
    pub domain_url: Option<String>,
    /// Signed counter delta from the transition table.
    pub delta: VoteDelta,
}

impl VoteApplied {
    /// Whether a domain community score should move for this event.
    pub fn affects_domain(&self) -> bool {
        self.domain_url.is_some() && !self.delta.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_votes_never_affect_domains() {
        let event = VoteApplied {
            target: TargetRef::comment("c1"),
            user_id: "u1".into(),
            domain_url: None,
            delta: VoteDelta::new(1, 0),
        };
        assert!(!event.affects_domain());
    }

    #[test]
    fn test_post_vote_with_url_affects_domain() {
        let event = VoteApplied {
            target: TargetRef::post("p1"),
            user_id: "u1".into(),
            domain_url: Some("https://example.com/a".into()),
            delta: VoteDelta::new(1, -1),
        };
        assert!(event.affects_domain());
    }
}
