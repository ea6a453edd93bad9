//! SyncClient - the main interface for roomsync.
//!
//! This module provides [`SyncClient`], which wires a [`Syncer`] to a
//! [`Dispatcher`] so applications only register listeners and start the loop.
//!
//! # Architecture
//!
//! ```text
//! Application → SyncClient → Syncer → Transport → Homeserver
//!                    ↓           ↓
//!               Dispatcher   sync-core (pure decomposition)
//! ```
//!
//! Two delivery modes are available:
//! - [`SyncClient::new`]: listeners run inline in the sync loop; a panicking
//!   listener stops the loop and the cursor is not advanced.
//! - [`SyncClient::with_event_queue`]: events go through a bounded queue to an
//!   [`EventListener`] the caller runs separately; a panicking listener ends
//!   the listener and closes the queue, and the loop fails on its next
//!   delivery with [`DispatchError::QueueClosed`](crate::dispatch::DispatchError::QueueClosed).
//!
//! # Example
//!
//! ```ignore
//! use sync_client::{SyncClient, SyncConfig, MockTransport, MemoryStore};
//!
//! let config = SyncConfig::new("https://hs.example", account);
//! let client = Arc::new(SyncClient::new(config, MockTransport::new(), MemoryStore::new()));
//! client.on(EventType::ROOM_MESSAGE, |event| println!("{:?}", event.body()));
//!
//! let task = client.spawn();
//! // ...
//! task.stop().await?;
//! ```

use std::sync::Arc;
use sync_types::{Event, EventType};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::dispatch::Dispatcher;
use crate::error::SyncError;
use crate::listener::{event_queue, EventListener};
use crate::policy::{FailurePolicy, FilterProvider};
use crate::store::CursorStore;
use crate::syncer::{IterationOutcome, Syncer};
use crate::task::SyncTask;
use crate::transport::Transport;

/// Main sync client.
///
/// Generic over transport and cursor store so tests can run it against
/// [`MockTransport`](crate::MockTransport) and [`MemoryStore`](crate::MemoryStore).
#[derive(Debug)]
pub struct SyncClient<T, S> {
    syncer: Syncer<T, S>,
    dispatcher: Arc<Dispatcher>,
}

impl<T: Transport, S: CursorStore> SyncClient<T, S> {
    /// Create a client dispatching events inline in the sync loop.
    pub fn new(config: SyncConfig, transport: T, store: S) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let syncer = Syncer::new(config, transport, store, dispatcher.clone());
        Self { syncer, dispatcher }
    }

    /// Create a client delivering events through a queue.
    ///
    /// The returned [`EventListener`] shares this client's dispatcher and must
    /// be run by the caller; until it runs, the sync loop blocks once
    /// `queue_capacity` events are waiting.
    pub fn with_event_queue(config: SyncConfig, transport: T, store: S) -> (Self, EventListener) {
        let dispatcher = Arc::new(Dispatcher::new());
        let (sink, listener) = event_queue(config.queue_capacity, dispatcher.clone());
        let syncer = Syncer::new(config, transport, store, Arc::new(sink));
        (Self { syncer, dispatcher }, listener)
    }

    /// Replace the failure policy.
    pub fn with_failure_policy(mut self, policy: impl FailurePolicy + 'static) -> Self {
        self.syncer = self.syncer.with_failure_policy(policy);
        self
    }

    /// Replace the filter provider.
    pub fn with_filter_provider(mut self, provider: impl FilterProvider + 'static) -> Self {
        self.syncer = self.syncer.with_filter_provider(provider);
        self
    }

    /// Register a listener for an event type.
    pub fn on<F>(&self, event_type: EventType, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.dispatcher.on(event_type, callback);
    }

    /// Run the sync loop until cancelled or stopped.
    pub async fn sync(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.syncer.run(cancel).await
    }

    /// Run a single sync iteration.
    pub async fn sync_once(&self, cancel: &CancellationToken) -> Result<IterationOutcome, SyncError> {
        self.syncer.sync_once(cancel).await
    }

    /// The listener registry.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The underlying sync loop.
    pub fn syncer(&self) -> &Syncer<T, S> {
        &self.syncer
    }
}

impl<T, S> SyncClient<T, S>
where
    T: Transport + 'static,
    S: CursorStore + 'static,
{
    /// Run the sync loop on the tokio runtime.
    pub fn spawn(self: &Arc<Self>) -> SyncTask {
        let cancel = CancellationToken::new();
        let client = Arc::clone(self);
        let token = cancel.clone();
        SyncTask::spawn(cancel, async move { client.sync(&token).await })
    }
}
