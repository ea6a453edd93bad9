//! Event fan-out to registered listeners.
//!
//! The [`Dispatcher`] maps each [`EventType`] to the callbacks registered for
//! it, in registration order. Dispatch takes the registry's read lock only
//! long enough to clone the callback list, so concurrent dispatches proceed in
//! parallel and registration never waits on a running callback.
//!
//! Every callback runs inside a panic boundary. A panicking callback aborts
//! delivery of that one event (callbacks after it in the list are skipped) and
//! is reported as [`DispatchError::ListenerPanicked`]; the registry itself is
//! left intact for later dispatches.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use sync_types::{Event, EventType, RoomId};
use thiserror::Error;

/// A listener callback.
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Errors raised while delivering events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// A listener panicked while handling an event.
    #[error("listener #{index} for {event_type} panicked{}: {message}", room_suffix(.room_id))]
    ListenerPanicked {
        /// Type of the event being delivered.
        event_type: EventType,
        /// Room of the event being delivered, if room-scoped.
        room_id: Option<RoomId>,
        /// Position of the listener in registration order.
        index: usize,
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The event queue's receiving side is gone.
    #[error("event queue closed")]
    QueueClosed,
}

fn room_suffix(room_id: &Option<RoomId>) -> String {
    room_id
        .as_ref()
        .map(|r| format!(" in {}", r))
        .unwrap_or_default()
}

/// Where the sync loop hands each iteration's events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one iteration's events, in order.
    ///
    /// Returning an error fails the iteration; the cursor is not advanced.
    async fn deliver(&self, events: Vec<Event>) -> Result<(), DispatchError>;
}

/// Registry of listener callbacks keyed by event type.
#[derive(Default)]
pub struct Dispatcher {
    listeners: RwLock<HashMap<EventType, Vec<Callback>>>,
}

impl Dispatcher {
    /// Create a dispatcher with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event type.
    ///
    /// Callbacks for the same type run in registration order.
    pub fn on<F>(&self, event_type: EventType, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(event_type)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Number of callbacks registered for an event type.
    pub fn listener_count(&self, event_type: &EventType) -> usize {
        self.listeners.read().get(event_type).map_or(0, Vec::len)
    }

    /// Deliver one event to every callback registered for its type.
    pub fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        let callbacks = match self.listeners.read().get(&event.event_type) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };

        for (index, callback) in callbacks.iter().enumerate() {
            panic::catch_unwind(AssertUnwindSafe(|| callback(event))).map_err(|payload| {
                let err = DispatchError::ListenerPanicked {
                    event_type: event.event_type.clone(),
                    room_id: event.room_id.clone(),
                    index,
                    message: panic_message(payload.as_ref()),
                };
                tracing::error!(error = %err, "listener panicked");
                err
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let mut types: Vec<_> = listeners
            .iter()
            .map(|(t, list)| (t.as_str().to_string(), list.len()))
            .collect();
        types.sort();
        f.debug_struct("Dispatcher")
            .field("listeners", &types)
            .finish()
    }
}

#[async_trait]
impl EventSink for Dispatcher {
    async fn deliver(&self, events: Vec<Event>) -> Result<(), DispatchError> {
        for event in &events {
            self.dispatch(event)?;
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
