//! Transport abstraction for roomsync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! long-poll request to the homeserver (HTTP client, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and request-oriented:
//! - `poll()` performs one long-poll with a cursor, filter and timeout hint
//! - `upload_filter()` optionally negotiates a server-side filter id
//!
//! Authentication and the wire schema live entirely inside implementations.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response(PollResponse::empty("s1"));
//! let response = transport.poll(&request, &cancel).await?;
//! ```

mod mock;

pub use mock::{MockStep, MockTransport};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use sync_types::{AccountId, Cursor, Filter, FilterId, PollResponse};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Transport errors.
///
/// All of these are recoverable by default; whether one stops the sync loop
/// is decided by the failure policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the homeserver.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The homeserver answered with an error status.
    #[error("http status {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Error body or reason phrase.
        message: String,
    },

    /// The response body could not be understood.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request exceeded its deadline.
    #[error("request timeout")]
    Timeout,

    /// The request was abandoned because the caller cancelled.
    #[error("request cancelled")]
    Cancelled,
}

/// One long-poll request.
#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    /// Base URL of the homeserver.
    pub homeserver_url: String,
    /// The account polling.
    pub account: AccountId,
    /// Cursor of the last fully delivered response (empty for the initial sync).
    pub since: Cursor,
    /// Filter narrowing the response.
    pub filter: Filter,
    /// How long the server may hold the request open.
    pub timeout: Duration,
}

/// Transport trait for performing long-poll sync requests.
///
/// Implementations handle the underlying HTTP client and authentication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one long-poll.
    ///
    /// Blocks until the server has data or the timeout hint elapses.
    /// Implementations should abandon the request and return
    /// [`TransportError::Cancelled`] when `cancel` fires; the sync loop also
    /// stops waiting on its own, so a transport that ignores the token is
    /// still cancellable.
    async fn poll(
        &self,
        request: &PollRequest,
        cancel: &CancellationToken,
    ) -> Result<PollResponse, TransportError>;

    /// Upload a filter definition and return the id the server assigned.
    ///
    /// Returns `Ok(None)` when the server does not negotiate filters; the
    /// definition is then sent inline with every poll.
    async fn upload_filter(
        &self,
        _account: &AccountId,
        _filter: &Value,
    ) -> Result<Option<FilterId>, TransportError> {
        Ok(None)
    }
}
