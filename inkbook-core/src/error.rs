//! Error types for core notebook operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core notebook operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persisted bytes could not be decoded into a document model.
    #[error("Could not load data model: {0}")]
    Deserialize(String),

    /// A model or drawing could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// A drawing blob does not contain valid ink.
    #[error("Invalid ink data: {0}")]
    InvalidInk(String),

    /// The settings file could not be read or written.
    #[error("Settings error: {0}")]
    Settings(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
