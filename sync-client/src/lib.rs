//! # sync-client
//!
//! Client side of roomsync: the long-poll sync loop of a federated messaging
//! client and the pipeline delivering its events to application listeners.
//!
//! ## Features
//!
//! - **Durable cursor**: the cursor is persisted only after every event of an
//!   iteration was delivered (at-least-once across restarts)
//! - **Pluggable I/O**: [`Transport`] and [`CursorStore`] traits (mock, memory
//!   and file implementations included)
//! - **Failure policies**: fixed-delay retry by default, exponential backoff
//!   with an attempt limit available
//! - **Panic isolation**: a panicking listener becomes a [`DispatchError`]
//! - **Queued delivery**: optional bounded queue between the loop and the
//!   listeners with independent shutdown
//! - **Pure decomposition**: uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{CancellationToken, MemoryStore, SyncClient, SyncConfig};
//!
//! let config = SyncConfig::from_file(Path::new("sync.toml"))?;
//! let client = SyncClient::new(config, transport, MemoryStore::new());
//! client.on(EventType::ROOM_MESSAGE, |event| println!("{:?}", event.body()));
//!
//! client.sync(&CancellationToken::new()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod policy;
pub mod store;
pub mod syncer;
pub mod task;
pub mod transport;

pub use client::SyncClient;
pub use config::{ConfigError, SyncConfig};
pub use dispatch::{Callback, DispatchError, Dispatcher, EventSink};
pub use error::SyncError;
pub use listener::{event_queue, EventListener, QueueSink, StopHandle};
pub use policy::{
    DefaultPolicy, ExponentialBackoffPolicy, FailedPoll, FailurePolicy, FilterProvider,
    RetryDecision,
};
pub use store::{CursorStore, FileStore, MemoryStore, StoreError};
pub use syncer::{IterationOutcome, Syncer};
pub use task::SyncTask;
pub use transport::{MockStep, MockTransport, PollRequest, Transport, TransportError};

pub use tokio_util::sync::CancellationToken;
