//! In-memory cursor store.

use super::{CursorStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use sync_types::{AccountId, Cursor, FilterId};

#[derive(Debug, Clone, Default)]
struct Entry {
    cursor: Cursor,
    filter_id: Option<FilterId>,
}

/// Cursor store kept in process memory.
///
/// Clones share state, so a test can keep a handle while the sync loop owns
/// another. Nothing survives a process restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<AccountId, Entry>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_cursor` calls so far.
    pub fn cursor_saves(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn load_cursor(&self, account: &AccountId) -> Result<Cursor, StoreError> {
        Ok(self
            .entries
            .lock()
            .get(account)
            .map(|e| e.cursor.clone())
            .unwrap_or_default())
    }

    async fn save_cursor(&self, account: &AccountId, cursor: &Cursor) -> Result<(), StoreError> {
        self.entries
            .lock()
            .entry(account.clone())
            .or_default()
            .cursor = cursor.clone();
        *self.saves.lock() += 1;
        Ok(())
    }

    async fn load_filter_id(&self, account: &AccountId) -> Result<Option<FilterId>, StoreError> {
        Ok(self
            .entries
            .lock()
            .get(account)
            .and_then(|e| e.filter_id.clone()))
    }

    async fn save_filter_id(
        &self,
        account: &AccountId,
        filter_id: &FilterId,
    ) -> Result<(), StoreError> {
        self.entries
            .lock()
            .entry(account.clone())
            .or_default()
            .filter_id = Some(filter_id.clone());
        Ok(())
    }
}
