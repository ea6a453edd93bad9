//! Configuration for the sync loop.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! homeserver_url = "https://matrix.example.org"
//! account_id = "@bot:example.org"
//! poll_timeout_ms = 30000
//! retry_delay_ms = 10000
//! timeline_limit = 50
//! queue_capacity = 256
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_types::AccountId;

/// Configuration for a sync loop.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the homeserver.
    pub homeserver_url: String,
    /// The account being synced.
    pub account_id: AccountId,
    /// Long-poll timeout hint sent to the server (default: 30s).
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Delay between failed polls for the default failure policy (default: 10s).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Timeline limit of the default filter (default: 50).
    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: u32,
    /// Capacity of the event queue in queued dispatch mode (default: 256).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

// Default value functions
fn default_poll_timeout_ms() -> u64 {
    30_000
}

fn default_retry_delay_ms() -> u64 {
    10_000
}

fn default_timeline_limit() -> u32 {
    sync_core::DEFAULT_TIMELINE_LIMIT
}

fn default_queue_capacity() -> usize {
    256
}

impl SyncConfig {
    /// Create a configuration with default timings.
    pub fn new(homeserver_url: &str, account_id: AccountId) -> Self {
        Self {
            homeserver_url: homeserver_url.to_string(),
            account_id,
            poll_timeout_ms: default_poll_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            timeline_limit: default_timeline_limit(),
            queue_capacity: default_queue_capacity(),
        }
    }

    /// Set the long-poll timeout hint.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the retry delay of the default failure policy.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the timeline limit of the default filter.
    pub fn with_timeline_limit(mut self, limit: u32) -> Self {
        self.timeline_limit = limit;
        self
    }

    /// Set the event queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// The long-poll timeout hint.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// The default retry delay.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.homeserver_url.is_empty() {
            return Err(ConfigError::Invalid("homeserver_url must not be empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: None,
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: Some(path.to_path_buf()),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration.
    #[error("failed to parse config{}: {source}", .path.as_ref().map(|p| format!(" file {}", p.display())).unwrap_or_default())]
    ParseError {
        /// Path to the configuration file, if read from disk.
        path: Option<PathBuf>,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}
