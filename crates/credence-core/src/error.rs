// crates/credence-core/src/error.rs

use thiserror::Error;

/// Engine-wide error types for Credence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredenceError {
    /// Target, domain, or upstream entity missing where required.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-owner mutation attempt on an upstream entity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad vote type, target kind, malformed URL, or empty content.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backing store unreachable. Never to be read as "no data".
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Transaction retries exhausted under contention.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Record encode/decode failure at the store boundary.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CredenceError {
    /// Whether a transaction runner may transparently retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CredenceError::StoreUnavailable(_) | CredenceError::Conflict(_)
        )
    }
}

impl From<serde_json::Error> for CredenceError {
    fn from(e: serde_json::Error) -> Self {
        CredenceError::Serialization(e.to_string())
    }
}
