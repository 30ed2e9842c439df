// crates/credence-scoring/src/lib.rs
//
// credence-scoring: Domain credibility scoring for the Credence engine.
//
// Pure score functions, the per-domain score record, the transactional
// DomainScoreStore, and the AnalysisAggregator that folds cross-check
// evidence into the primary and cited domains.

pub mod analysis;
pub mod calculator;
pub mod domain_store;
pub mod record;

pub use analysis::{AnalysisAggregator, AnalysisReport, FailedSource, Stance};
pub use domain_store::{DomainRanking, DomainScoreStore};
pub use record::DomainScoreRecord;
