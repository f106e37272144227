//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The drawing blob could not be decoded as ink.
    #[error("Failed to decode drawing: {0}")]
    Decode(String),

    /// The requested output area has no pixels.
    #[error("Empty render target: {width}x{height}")]
    EmptyTarget {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// Pixel buffer allocation failed.
    #[error("Failed to create pixmap: {0}")]
    Pixmap(String),

    /// Image encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl From<inkbook_core::CoreError> for RenderError {
    fn from(err: inkbook_core::CoreError) -> Self {
        Self::Decode(err.to_string())
    }
}
