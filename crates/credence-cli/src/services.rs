// crates/credence-cli/src/services.rs
//
// Services: the wired engine for one process.
//
// Constructed once in main.rs over a single DocumentStore. Every component
// shares that store and one retry policy; the vote aggregator is pointed at
// the domain score store so post votes move domain credibility.

use std::sync::Arc;

use credence_core::traits::DocumentStore;
use credence_community::{AnalysisHistory, CommunityBoard, VoteAggregator};
use credence_scoring::{AnalysisAggregator, DomainScoreStore};
use credence_store::{MemoryStore, RetryPolicy, RocksStore};

use crate::config::{Backend, CredenceConfig};

#[derive(Clone)]
pub struct Services {
    pub domains: Arc<DomainScoreStore>,
    pub analysis: AnalysisAggregator,
    pub votes: VoteAggregator,
    pub history: AnalysisHistory,
    pub board: CommunityBoard,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        let domains = Arc::new(DomainScoreStore::new(store.clone(), policy));
        Self {
            analysis: AnalysisAggregator::new(domains.clone()),
            votes: VoteAggregator::new(store.clone(), policy).with_sink(domains.clone()),
            history: AnalysisHistory::new(store.clone(), policy),
            board: CommunityBoard::new(store, policy),
            domains,
        }
    }

    /// Open the configured backend and wire the engine over it.
    pub fn open(config: &CredenceConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn DocumentStore> = match config.backend {
            Backend::Rocksdb => {
                let db_path = format!("{}/rocksdb", expand_tilde(&config.data_dir));
                std::fs::create_dir_all(&db_path)?;
                let store = RocksStore::open(&db_path)?;
                tracing::info!("RocksStore opened at {}", db_path);
                Arc::new(store)
            }
            Backend::Memory => {
                tracing::warn!("Using in-memory store; nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store, config.retry_policy()))
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
