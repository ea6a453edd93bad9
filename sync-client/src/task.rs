//! Handle to a sync loop or event listener running on the tokio runtime.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

/// A spawned loop together with the token that cancels it.
#[derive(Debug)]
pub struct SyncTask {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), SyncError>>,
}

impl SyncTask {
    /// Spawn `fut`, which must observe `cancel`.
    pub fn spawn<F>(cancel: CancellationToken, fut: F) -> Self
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        Self {
            cancel,
            handle: tokio::spawn(fut),
        }
    }

    /// The token cancelling this task.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to wind down.
    ///
    /// A cancelled exit is reported as `Ok(())`; any other error the loop
    /// stopped with is returned.
    pub async fn stop(self) -> Result<(), SyncError> {
        self.cancel.cancel();
        match self.join().await {
            Err(SyncError::Cancelled) => Ok(()),
            other => other,
        }
    }

    /// Wait for the task to finish on its own.
    pub async fn join(self) -> Result<(), SyncError> {
        self.handle
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    }
}
