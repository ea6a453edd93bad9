//! Pluggable policies consulted by the sync loop.
//!
//! - [`FailurePolicy`] decides what happens after a failed poll: retry after
//!   a delay, or stop the loop for good.
//! - [`FilterProvider`] supplies the filter definition used when no filter id
//!   has been negotiated yet.
//!
//! [`DefaultPolicy`] implements both: a fixed retry delay that never gives up,
//! and a filter limiting room timelines to 50 events. Transport failures are
//! never fatal unless the caller installs a stricter policy.

use serde_json::Value;
use std::time::Duration;
use sync_types::{AccountId, PollResponse};

use crate::config::SyncConfig;
use crate::transport::TransportError;

/// Context handed to a [`FailurePolicy`] after a failed poll.
#[derive(Debug)]
pub struct FailedPoll<'a> {
    /// The last successful response of the current run, if any.
    pub last_response: Option<&'a PollResponse>,
    /// The error the poll failed with.
    pub error: &'a TransportError,
    /// How many polls in a row have failed, including this one.
    pub consecutive_failures: u32,
}

/// What the sync loop should do after a failed poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the delay, then poll again with the same cursor.
    RetryAfter(Duration),
    /// Stop the loop permanently with this reason.
    Fatal(String),
}

/// Decides how the sync loop reacts to transport failures.
pub trait FailurePolicy: Send + Sync {
    /// Called once per failed poll.
    fn on_failed_poll(&self, failure: &FailedPoll<'_>) -> RetryDecision;
}

/// Supplies the filter definition for an account.
pub trait FilterProvider: Send + Sync {
    /// The filter definition JSON (not a filter id).
    fn filter_json(&self, account: &AccountId) -> Value;
}

/// Fixed retry delay, never fatal, timeline-limited filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPolicy {
    retry_delay: Duration,
    timeline_limit: u32,
}

impl DefaultPolicy {
    /// Retry delay used when none is configured.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

    /// Create a policy with explicit settings.
    pub fn new(retry_delay: Duration, timeline_limit: u32) -> Self {
        Self {
            retry_delay,
            timeline_limit,
        }
    }

    /// Create a policy from the sync configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.retry_delay(), config.timeline_limit)
    }

    /// The fixed retry delay.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETRY_DELAY, sync_core::DEFAULT_TIMELINE_LIMIT)
    }
}

impl FailurePolicy for DefaultPolicy {
    fn on_failed_poll(&self, _failure: &FailedPoll<'_>) -> RetryDecision {
        RetryDecision::RetryAfter(self.retry_delay)
    }
}

impl FilterProvider for DefaultPolicy {
    fn filter_json(&self, _account: &AccountId) -> Value {
        sync_core::timeline_filter(self.timeline_limit)
    }
}

/// Exponential backoff with jitter and an optional attempt limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoffPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: Option<u32>,
}

impl ExponentialBackoffPolicy {
    /// Create a policy doubling from `base` up to `cap`, retrying forever.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            max_attempts: None,
        }
    }

    /// Give up after this many consecutive failures.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

impl FailurePolicy for ExponentialBackoffPolicy {
    fn on_failed_poll(&self, failure: &FailedPoll<'_>) -> RetryDecision {
        if let Some(max) = self.max_attempts {
            if failure.consecutive_failures >= max {
                return RetryDecision::Fatal(format!(
                    "giving up after {} consecutive failed polls",
                    failure.consecutive_failures
                ));
            }
        }
        RetryDecision::RetryAfter(sync_core::exponential_backoff(
            failure.consecutive_failures,
            self.base,
            self.cap,
        ))
    }
}
