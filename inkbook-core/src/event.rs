//! Change notifications emitted by the model and the document.

use serde::{Deserialize, Serialize};

use crate::DocumentState;

/// A settled change to the model or its thumbnails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelEvent {
    /// The drawing at `index` was replaced.
    DrawingReplaced {
        /// Index of the replaced drawing.
        index: usize,
    },
    /// A drawing was appended at `index`.
    DrawingAppended {
        /// Index of the new drawing.
        index: usize,
    },
    /// The drawing at `index` was removed; later drawings shifted down.
    DrawingRemoved {
        /// Index the drawing occupied.
        index: usize,
    },
    /// A fresh thumbnail for `index` landed in the cache.
    ThumbnailUpdated {
        /// Index of the updated thumbnail.
        index: usize,
    },
    /// Every cached thumbnail was invalidated.
    ThumbnailsInvalidated,
    /// The whole model was swapped for a newly loaded one.
    ModelReplaced {
        /// Number of drawings in the new model.
        len: usize,
    },
}

/// A document lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    /// The lifecycle state or one of its flags changed.
    StateChanged {
        /// The new state.
        state: DocumentState,
    },
    /// The document finished opening.
    Opened {
        /// Number of drawings loaded from storage.
        loaded: usize,
        /// Set when stored bytes were unreadable and a default model was used.
        recovered_from: Option<String>,
    },
    /// Storage reported divergent versions of the document.
    ConflictDetected {
        /// Number of versions involved, including the current one.
        versions: usize,
    },
    /// Conflicting versions were resolved into a single model.
    ConflictResolved {
        /// Number of drawings in the resolved model.
        drawings: usize,
    },
    /// A write to storage succeeded.
    Saved,
    /// A write to storage failed.
    SaveFailed {
        /// Failure description.
        reason: String,
    },
}
