//! Queued event delivery.
//!
//! In queued mode the sync loop does not call listeners itself. It pushes
//! each iteration's events into a bounded channel through a [`QueueSink`],
//! and an [`EventListener`] running as a separate task pulls them out and
//! dispatches them. The poll loop and the dispatch loop can then be stopped
//! independently.
//!
//! ```text
//! Syncer ──deliver──► QueueSink ══mpsc══► EventListener ──dispatch──► callbacks
//! ```
//!
//! The listener stops when:
//! - the stop signal fires: events already queued are dispatched, then `Ok(())`
//! - the cancellation token fires: returns [`SyncError::Cancelled`] at once
//! - every sender is dropped and the queue is empty: `Ok(())`
//! - a listener panics: closes the queue and returns [`SyncError::Dispatch`];
//!   later deliveries fail with [`DispatchError::QueueClosed`]

use async_trait::async_trait;
use std::sync::Arc;
use sync_types::{Event, EventType};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchError, Dispatcher, EventSink};
use crate::error::SyncError;

/// Create a connected sink/listener pair sharing `dispatcher`.
pub fn event_queue(capacity: usize, dispatcher: Arc<Dispatcher>) -> (QueueSink, EventListener) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueSink { tx }, EventListener::new(rx, dispatcher))
}

/// Sending half of the event queue; the sync loop's [`EventSink`] in queued mode.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::Sender<Event>,
}

impl QueueSink {
    /// Wrap an existing channel sender.
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for QueueSink {
    async fn deliver(&self, events: Vec<Event>) -> Result<(), DispatchError> {
        for event in events {
            self.tx
                .send(event)
                .await
                .map_err(|_| DispatchError::QueueClosed)?;
        }
        Ok(())
    }
}

/// Requests a graceful stop of an [`EventListener`].
///
/// Cloneable; stopping more than once has no further effect.
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// Ask the listener to drain queued events and exit.
    pub fn stop(&self) {
        self.0.cancel();
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Receiving half of the event queue, dispatching to listeners.
#[derive(Debug)]
pub struct EventListener {
    events: mpsc::Receiver<Event>,
    dispatcher: Arc<Dispatcher>,
    stop: CancellationToken,
}

impl EventListener {
    /// Create a listener pulling from `events`.
    pub fn new(events: mpsc::Receiver<Event>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            events,
            dispatcher,
            stop: CancellationToken::new(),
        }
    }

    /// Register a callback for an event type.
    pub fn on<F>(&self, event_type: EventType, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.dispatcher.on(event_type, callback);
    }

    /// The dispatcher this listener delivers through.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// A handle for requesting a graceful stop.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// Pull and dispatch events until stopped, cancelled, closed or faulted.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), SyncError> {
        tracing::debug!("event listener started");
        let result = self.pump(cancel).await;
        if let Err(SyncError::Dispatch(_)) = &result {
            // No consumer is left, so the producer must see the queue closed
            self.events.close();
        }
        match &result {
            Ok(()) => tracing::debug!("event listener stopped"),
            Err(SyncError::Cancelled) => tracing::debug!("event listener cancelled"),
            Err(e) => tracing::error!(error = %e, "event listener failed"),
        }
        result
    }

    async fn pump(&mut self, cancel: &CancellationToken) -> Result<(), SyncError> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                _ = self.stop.cancelled() => return self.drain(),
                next = self.events.recv() => match next {
                    Some(event) => self.dispatcher.dispatch(&event)?,
                    None => return Ok(()),
                },
            }
        }
    }

    /// Dispatch whatever is already queued without waiting for more.
    fn drain(&mut self) -> Result<(), SyncError> {
        let mut drained = 0usize;
        while let Ok(event) = self.events.try_recv() {
            self.dispatcher.dispatch(&event)?;
            drained += 1;
        }
        tracing::debug!(drained, "event queue drained on stop");
        Ok(())
    }
}
