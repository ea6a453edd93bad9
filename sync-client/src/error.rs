//! Errors surfaced by the sync loop and event listener.

use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::store::StoreError;
use crate::transport::TransportError;

/// Reasons a sync loop or event listener stopped.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The caller cancelled the loop.
    #[error("sync cancelled")]
    Cancelled,

    /// The failure policy gave up.
    #[error("sync stopped: {reason}")]
    Fatal {
        /// Reason given by the failure policy.
        reason: String,
        /// The transport error that triggered the decision.
        #[source]
        source: TransportError,
    },

    /// The cursor store failed.
    #[error("cursor store error: {0}")]
    Store(#[from] StoreError),

    /// Event delivery failed.
    #[error("event delivery failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The background task panicked or was aborted.
    #[error("sync task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Whether the loop stopped because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
