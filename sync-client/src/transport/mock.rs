//! Mock transport for testing.
//!
//! Plays back a script of responses and failures and records every request
//! for verification.

use super::{PollRequest, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use sync_types::{AccountId, FilterId, PollResponse};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// One scripted outcome of a `poll()` call.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Return this response.
    Respond(PollResponse),
    /// Fail with this error.
    Fail(TransportError),
    /// Hold the request open until cancelled, then return `Cancelled`.
    Hang,
    /// Hold the request open forever, ignoring cancellation.
    Stall,
}

/// Mock transport for testing.
///
/// Polls consume the script front to back. Once the script is exhausted every
/// further poll behaves like [`MockStep::Hang`], as a long-poll with no new
/// data would.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    polled: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    script: VecDeque<MockStep>,
    requests: Vec<PollRequest>,
    uploaded_filters: Vec<Value>,
    filter_id: Option<FilterId>,
    fail_next_upload: Option<TransportError>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a future `poll()`.
    pub fn queue_response(&self, response: PollResponse) {
        self.queue(MockStep::Respond(response));
    }

    /// Queue a failure for a future `poll()`.
    pub fn queue_failure(&self, error: TransportError) {
        self.queue(MockStep::Fail(error));
    }

    /// Queue an arbitrary step.
    pub fn queue(&self, step: MockStep) {
        self.inner.lock().script.push_back(step);
    }

    /// Make `upload_filter()` negotiate the given filter id.
    ///
    /// Without this the mock behaves like a server that does not negotiate.
    pub fn negotiate_filter_id(&self, id: FilterId) {
        self.inner.lock().filter_id = Some(id);
    }

    /// Cause the next `upload_filter()` to fail.
    pub fn fail_next_upload(&self, error: TransportError) {
        self.inner.lock().fail_next_upload = Some(error);
    }

    /// All poll requests received so far.
    pub fn requests(&self) -> Vec<PollRequest> {
        self.inner.lock().requests.clone()
    }

    /// The most recent poll request.
    pub fn last_request(&self) -> Option<PollRequest> {
        self.inner.lock().requests.last().cloned()
    }

    /// Number of polls received so far.
    pub fn poll_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Filter definitions passed to `upload_filter()`.
    pub fn uploaded_filters(&self) -> Vec<Value> {
        self.inner.lock().uploaded_filters.clone()
    }

    /// Wait until at least `count` polls have been received.
    pub async fn wait_for_polls(&self, count: usize) {
        loop {
            let notified = self.polled.notified();
            if self.poll_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Clear all state (script, recorded requests, filter negotiation).
    pub fn reset(&self) {
        *self.inner.lock() = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            polled: Arc::clone(&self.polled),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn poll(
        &self,
        request: &PollRequest,
        cancel: &CancellationToken,
    ) -> Result<PollResponse, TransportError> {
        let step = {
            let mut inner = self.inner.lock();
            inner.requests.push(request.clone());
            inner.script.pop_front().unwrap_or(MockStep::Hang)
        };
        self.polled.notify_waiters();

        match step {
            MockStep::Respond(response) => Ok(response),
            MockStep::Fail(error) => Err(error),
            MockStep::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
            MockStep::Stall => std::future::pending().await,
        }
    }

    async fn upload_filter(
        &self,
        _account: &AccountId,
        filter: &Value,
    ) -> Result<Option<FilterId>, TransportError> {
        let mut inner = self.inner.lock();
        if let Some(error) = inner.fail_next_upload.take() {
            return Err(error);
        }
        inner.uploaded_filters.push(filter.clone());
        Ok(inner.filter_id.clone())
    }
}
