//! Error types for document synchronization.

use inkbook_core::CoreError;
use inkbook_render::RenderError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing a document.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A write to storage failed.
    #[error("Write failed: {0}")]
    Write(String),

    /// The operation needs an open document.
    #[error("Document is not open")]
    NotOpen,

    /// The operation is not valid in the current lifecycle state.
    #[error("Invalid document state: {0}")]
    InvalidState(String),

    /// A background task was cancelled or panicked.
    #[error("Background task failed: {0}")]
    Task(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A core model error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A rendering error.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
