//! File-backed cursor store.
//!
//! Each account gets one JSON document, `<hex(account)>.json`, in the store
//! directory:
//!
//! ```json
//! { "cursor": "s72594_4483_1934", "filter_id": "7" }
//! ```
//!
//! Writes go to a temporary file that is then renamed over the document, so
//! a reader never observes a torn write.

use super::{CursorStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sync_types::{AccountId, Cursor, FilterId};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CursorDocument {
    #[serde(default)]
    cursor: Cursor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter_id: Option<FilterId>,
}

/// Cursor store persisting one JSON document per account.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// The directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, account: &AccountId) -> PathBuf {
        self.dir
            .join(format!("{}.json", hex::encode(account.as_str())))
    }

    async fn read(&self, account: &AccountId) -> Result<CursorDocument, StoreError> {
        let path = self.path_for(account);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CursorDocument::default())
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })
    }

    async fn write(&self, account: &AccountId, doc: &CursorDocument) -> Result<(), StoreError> {
        let path = self.path_for(account);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    async fn update(
        &self,
        account: &AccountId,
        apply: impl FnOnce(&mut CursorDocument) + Send,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(account).await?;
        apply(&mut doc);
        self.write(account, &doc).await
    }
}

#[async_trait]
impl CursorStore for FileStore {
    async fn load_cursor(&self, account: &AccountId) -> Result<Cursor, StoreError> {
        Ok(self.read(account).await?.cursor)
    }

    async fn save_cursor(&self, account: &AccountId, cursor: &Cursor) -> Result<(), StoreError> {
        let cursor = cursor.clone();
        self.update(account, move |doc| doc.cursor = cursor).await?;
        tracing::trace!(account = %account, "cursor persisted");
        Ok(())
    }

    async fn load_filter_id(&self, account: &AccountId) -> Result<Option<FilterId>, StoreError> {
        Ok(self.read(account).await?.filter_id)
    }

    async fn save_filter_id(
        &self,
        account: &AccountId,
        filter_id: &FilterId,
    ) -> Result<(), StoreError> {
        let filter_id = filter_id.clone();
        self.update(account, move |doc| doc.filter_id = Some(filter_id))
            .await
    }
}
