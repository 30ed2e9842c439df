// crates/credence-core/src/lib.rs
//
// credence-core: Core types, traits, and the vote state machine for the
// Credence domain-credibility engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the error taxonomy, the keyed document model consumed from the
// backing store, domain and vote value types, and the trait interfaces that
// decouple vote mechanics from scoring policy.

pub mod document;
pub mod domain;
pub mod error;
pub mod events;
pub mod evidence;
pub mod traits;
pub mod vote;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use credence_core::VoteType;`

// Document model
pub use document::{Collection, DocKey, Document, Precondition, Write};

// Domain types
pub use domain::{extract_domain, is_https_url, DomainCredibility, DomainMetadata, ScoreBreakdown};

// Evidence types
pub use evidence::{CrossCheckResult, SourceCitation};

// Vote types
pub use vote::{TargetKind, TargetRef, Transition, VoteDelta, VoteState, VoteType};

// Events
pub use events::VoteApplied;

// Error type
pub use error::CredenceError;

// Traits
pub use traits::{DocumentStore, VoteEventSink};
