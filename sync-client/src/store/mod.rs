//! Cursor store for roomsync.
//!
//! Persists, per account, the cursor of the last fully delivered response and
//! the negotiated filter id. The sync loop is the only writer for its account.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::path::PathBuf;
use sync_types::{AccountId, Cursor, FilterId};
use thiserror::Error;

/// Cursor store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A stored document could not be (de)serialized.
    #[error("corrupt cursor document {path}: {source}")]
    Corrupt {
        /// The file involved.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The store cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Trait for cursor storage backends.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Load the cursor for an account.
    ///
    /// Returns [`Cursor::initial()`] if nothing was saved yet.
    async fn load_cursor(&self, account: &AccountId) -> Result<Cursor, StoreError>;

    /// Save the cursor for an account.
    async fn save_cursor(&self, account: &AccountId, cursor: &Cursor) -> Result<(), StoreError>;

    /// Load the negotiated filter id for an account, if any.
    async fn load_filter_id(&self, account: &AccountId) -> Result<Option<FilterId>, StoreError>;

    /// Save the negotiated filter id for an account.
    async fn save_filter_id(
        &self,
        account: &AccountId,
        filter_id: &FilterId,
    ) -> Result<(), StoreError>;
}
