//! The long-poll sync loop.
//!
//! One iteration:
//!
//! ```text
//! load cursor ─► resolve filter ─► poll ─► decompose ─► deliver ─► save cursor
//!                                    │
//!                                    └─ error ─► failure policy ─► sleep / stop
//! ```
//!
//! The cursor is saved only after the sink accepted every event of the
//! iteration, so a crash mid-delivery replays the response on restart.
//! Cancellation is observed while waiting on the transport, the retry sleep
//! and the sink, and always wins over a pending failure decision.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use sync_core::{Decomposer, Decomposition};
use sync_types::{AccountId, Cursor, Filter, FilterId, PollResponse};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::dispatch::EventSink;
use crate::error::SyncError;
use crate::policy::{DefaultPolicy, FailedPoll, FailurePolicy, FilterProvider, RetryDecision};
use crate::store::CursorStore;
use crate::transport::{PollRequest, Transport, TransportError};

/// Result of a single sync iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Events were delivered and the cursor advanced.
    Synced {
        /// Number of events delivered.
        events: usize,
        /// The cursor now persisted.
        next_batch: Cursor,
    },
    /// The poll was an initial sync; nothing was delivered, the cursor advanced.
    InitialSync {
        /// The cursor now persisted.
        next_batch: Cursor,
    },
    /// The poll failed and the failure policy asked for a retry.
    RetryAfter(Duration),
}

/// State carried between iterations of one `run`.
#[derive(Debug, Default)]
struct RunState {
    last_response: Option<PollResponse>,
    consecutive_failures: u32,
    filter: Option<Filter>,
    /// Negotiated during this run, not yet persisted.
    unsaved_filter_id: Option<FilterId>,
}

/// Drives the sync loop for one account.
pub struct Syncer<T, S> {
    config: SyncConfig,
    transport: T,
    store: S,
    sink: Arc<dyn EventSink>,
    decomposer: Decomposer,
    failure_policy: Arc<dyn FailurePolicy>,
    filter_provider: Arc<dyn FilterProvider>,
    /// Filter the server declined to negotiate; never persisted.
    inline_filter: Mutex<Option<Filter>>,
}

impl<T: Transport, S: CursorStore> Syncer<T, S> {
    /// Create a syncer delivering into `sink`, with the default policies.
    pub fn new(config: SyncConfig, transport: T, store: S, sink: Arc<dyn EventSink>) -> Self {
        let policy = Arc::new(DefaultPolicy::from_config(&config));
        Self {
            decomposer: Decomposer::new(config.account_id.clone()),
            config,
            transport,
            store,
            sink,
            failure_policy: policy.clone(),
            filter_provider: policy,
            inline_filter: Mutex::new(None),
        }
    }

    /// Replace the failure policy.
    pub fn with_failure_policy(mut self, policy: impl FailurePolicy + 'static) -> Self {
        self.failure_policy = Arc::new(policy);
        self
    }

    /// Replace the filter provider.
    pub fn with_filter_provider(mut self, provider: impl FilterProvider + 'static) -> Self {
        self.filter_provider = Arc::new(provider);
        *self.inline_filter.get_mut() = None;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The account being synced.
    pub fn account(&self) -> &AccountId {
        &self.config.account_id
    }

    /// Get a reference to the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a reference to the cursor store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one iteration without sleeping on failure.
    ///
    /// Safe to call repeatedly: every call resumes from the persisted cursor
    /// and filter id. An inline filter is uploaded once per syncer.
    pub async fn sync_once(&self, cancel: &CancellationToken) -> Result<IterationOutcome, SyncError> {
        self.iterate(cancel, &mut RunState::default()).await
    }

    /// Run the loop until cancelled or stopped by the failure policy.
    ///
    /// Never returns `Ok`: a cancelled loop returns [`SyncError::Cancelled`].
    #[tracing::instrument(skip_all, fields(account = %self.config.account_id))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        tracing::info!(homeserver = %self.config.homeserver_url, "sync loop started");
        let mut state = RunState::default();

        let err = loop {
            match self.iterate(cancel, &mut state).await {
                Ok(IterationOutcome::RetryAfter(delay)) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break SyncError::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Ok(_) => {}
                Err(e) => break e,
            }
        };

        if err.is_cancelled() {
            tracing::info!("sync loop cancelled");
        } else {
            tracing::error!(error = %err, "sync loop stopped");
        }
        Err(err)
    }

    async fn iterate(
        &self,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> Result<IterationOutcome, SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let account = &self.config.account_id;
        let since = self.store.load_cursor(account).await?;

        let filter = match &state.filter {
            Some(filter) => filter.clone(),
            None => {
                let filter = match self.store.load_filter_id(account).await? {
                    Some(id) => Filter::Id(id),
                    None => {
                        let cached = self.inline_filter.lock().clone();
                        match cached {
                            Some(inline) => inline,
                            None => match self.negotiate(cancel).await? {
                                Ok((filter, Some(id))) => {
                                    state.unsaved_filter_id = Some(id);
                                    filter
                                }
                                Ok((filter, None)) => {
                                    *self.inline_filter.lock() = Some(filter.clone());
                                    filter
                                }
                                Err(error) => return self.on_failure(state, error),
                            },
                        }
                    }
                };
                state.filter = Some(filter.clone());
                filter
            }
        };

        let request = PollRequest {
            homeserver_url: self.config.homeserver_url.clone(),
            account: account.clone(),
            since,
            filter,
            timeout: self.config.poll_timeout(),
        };
        tracing::debug!(since = %request.since, "polling");

        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            polled = self.transport.poll(&request, cancel) => polled,
        };
        let response = match polled {
            Ok(response) => response,
            Err(TransportError::Cancelled) if cancel.is_cancelled() => {
                return Err(SyncError::Cancelled)
            }
            Err(error) => return self.on_failure(state, error),
        };
        state.consecutive_failures = 0;

        let (decomposition, stats) = self
            .decomposer
            .decompose_with_stats(&response, &request.since);
        let outcome = match decomposition {
            Decomposition::InitialSync => {
                tracing::debug!(next_batch = %response.next_batch, "initial sync, output suppressed");
                IterationOutcome::InitialSync {
                    next_batch: response.next_batch.clone(),
                }
            }
            Decomposition::Events(events) => {
                tracing::debug!(
                    events = stats.emitted,
                    flooded_rooms = stats.flooded_rooms,
                    next_batch = %response.next_batch,
                    "delivering events"
                );
                if !events.is_empty() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                        delivered = self.sink.deliver(events) => delivered?,
                    }
                }
                IterationOutcome::Synced {
                    events: stats.emitted,
                    next_batch: response.next_batch.clone(),
                }
            }
        };

        if let Some(id) = state.unsaved_filter_id.take() {
            self.store.save_filter_id(account, &id).await?;
        }
        self.store.save_cursor(account, &response.next_batch).await?;
        state.last_response = Some(response);
        Ok(outcome)
    }

    /// Negotiate a filter unless cancelled first.
    async fn negotiate(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Result<(Filter, Option<FilterId>), TransportError>, SyncError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            negotiated = self.negotiate_filter() => Ok(negotiated),
        }
    }

    /// Upload the provider's filter; fall back to sending it inline.
    async fn negotiate_filter(&self) -> Result<(Filter, Option<FilterId>), TransportError> {
        let account = &self.config.account_id;
        let json = self.filter_provider.filter_json(account);
        match self.transport.upload_filter(account, &json).await? {
            Some(id) => {
                tracing::debug!(filter_id = %id, "filter negotiated");
                Ok((Filter::Id(id.clone()), Some(id)))
            }
            None => Ok((Filter::Inline(json), None)),
        }
    }

    fn on_failure(
        &self,
        state: &mut RunState,
        error: TransportError,
    ) -> Result<IterationOutcome, SyncError> {
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        let decision = self.failure_policy.on_failed_poll(&FailedPoll {
            last_response: state.last_response.as_ref(),
            error: &error,
            consecutive_failures: state.consecutive_failures,
        });

        match decision {
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    error = %error,
                    failures = state.consecutive_failures,
                    retry_ms = delay.as_millis() as u64,
                    "poll failed, retrying"
                );
                Ok(IterationOutcome::RetryAfter(delay))
            }
            RetryDecision::Fatal(reason) => {
                tracing::error!(error = %error, reason = %reason, "poll failed, giving up");
                Err(SyncError::Fatal {
                    reason,
                    source: error,
                })
            }
        }
    }
}

impl<T, S> std::fmt::Debug for Syncer<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("homeserver_url", &self.config.homeserver_url)
            .field("account", &self.config.account_id)
            .finish_non_exhaustive()
    }
}
