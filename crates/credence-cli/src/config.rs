// crates/credence-cli/src/config.rs
//
// Runtime configuration for the credence binary.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;
use std::time::Duration;

use credence_store::RetryPolicy;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Persistent RocksDB store under `data_dir`.
    Rocksdb,
    /// Process-local store; nothing survives exit.
    Memory,
}

/// Runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CredenceConfig {
    /// Directory for local data storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Attempts per transaction before a conflict is surfaced.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between transaction attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> String {
    "~/.credence/data".to_string()
}

fn default_backend() -> Backend {
    Backend::Rocksdb
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CredenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: default_backend(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            log_level: default_log_level(),
        }
    }
}

impl CredenceConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: CredenceConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = CredenceConfig::parse("").unwrap();
        assert_eq!(config.data_dir, "~/.credence/data");
        assert_eq!(config.backend, Backend::Rocksdb);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_override() {
        let config = CredenceConfig::parse(
            r#"
            backend = "memory"
            max_attempts = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.retry_policy().max_attempts, 8);
        assert_eq!(config.retry_policy().backoff, Duration::from_millis(10));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(CredenceConfig::parse(r#"backend = "postgres""#).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(CredenceConfig::load("/nonexistent/credence.toml").is_err());
    }
}
