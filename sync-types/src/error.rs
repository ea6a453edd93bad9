//! Error types for roomsync-types.

use thiserror::Error;

/// Errors raised while constructing or parsing roomsync types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// An identifier was empty or otherwise malformed.
    #[error("invalid {kind} id: {value:?}")]
    InvalidId {
        /// Which identifier kind was being built.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
