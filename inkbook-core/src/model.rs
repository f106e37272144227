//! The document model - an ordered collection of drawings.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, DrawingBlob};

/// Current persisted format version.
pub const FORMAT_VERSION: u32 = 1;

/// Ordered collection of drawings that makes up one notebook.
///
/// Mutating methods are bounds-checked and report out-of-range indices through
/// their return values instead of panicking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentModel {
    drawings: Vec<DrawingBlob>,
}

/// On-disk representation of a [`DocumentModel`].
#[derive(Serialize, Deserialize)]
struct PersistedDocument {
    version: u32,
    drawings: Vec<DrawingBlob>,
}

impl DocumentModel {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model from existing drawings.
    #[must_use]
    pub fn from_drawings(drawings: Vec<DrawingBlob>) -> Self {
        Self { drawings }
    }

    /// Number of drawings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    /// Check if the model has no drawings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    /// Get the drawing at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DrawingBlob> {
        self.drawings.get(index)
    }

    /// All drawings in order.
    #[must_use]
    pub fn drawings(&self) -> &[DrawingBlob] {
        &self.drawings
    }

    /// Replace the drawing at `index`, returning the previous one.
    ///
    /// Returns `None` without changing anything if `index` is out of range.
    pub fn replace(&mut self, index: usize, drawing: DrawingBlob) -> Option<DrawingBlob> {
        let slot = self.drawings.get_mut(index)?;
        Some(std::mem::replace(slot, drawing))
    }

    /// Append a drawing and return its index.
    pub fn push(&mut self, drawing: DrawingBlob) -> usize {
        self.drawings.push(drawing);
        self.drawings.len() - 1
    }

    /// Remove the drawing at `index`.
    ///
    /// Returns `None` without changing anything if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Option<DrawingBlob> {
        (index < self.drawings.len()).then(|| self.drawings.remove(index))
    }

    /// Consume the model, yielding its drawings.
    #[must_use]
    pub fn into_drawings(self) -> Vec<DrawingBlob> {
        self.drawings
    }

    /// Encode the whole model for durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialize`] if encoding fails.
    pub fn serialize(&self) -> CoreResult<Vec<u8>> {
        let doc = PersistedDocument {
            version: FORMAT_VERSION,
            drawings: self.drawings.clone(),
        };
        serde_json::to_vec(&doc).map_err(|e| CoreError::Serialize(e.to_string()))
    }

    /// Decode a model from persisted bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Deserialize`] if the bytes are corrupt or were
    /// written by an unknown format version.
    pub fn deserialize(bytes: &[u8]) -> CoreResult<Self> {
        let doc: PersistedDocument =
            serde_json::from_slice(bytes).map_err(|e| CoreError::Deserialize(e.to_string()))?;
        if doc.version != FORMAT_VERSION {
            return Err(CoreError::Deserialize(format!(
                "unsupported format version {}",
                doc.version
            )));
        }
        Ok(Self {
            drawings: doc.drawings,
        })
    }
}

impl FromIterator<DrawingBlob> for DocumentModel {
    fn from_iter<I: IntoIterator<Item = DrawingBlob>>(iter: I) -> Self {
        Self {
            drawings: iter.into_iter().collect(),
        }
    }
}
