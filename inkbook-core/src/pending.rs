//! Drawings created before the document finished opening.
//!
//! ```text
//! 1. While the document is not open: new and edited drawings buffer here
//! 2. On the Opening -> Open transition: the buffer is taken exactly once
//! 3. Afterwards: edits go straight to the model
//! ```

use crate::DrawingBlob;

/// Ordered buffer of local drawings waiting for the document to open.
#[derive(Debug, Clone, Default)]
pub struct PendingDrawings {
    drawings: Vec<DrawingBlob>,
    merged: bool,
}

impl PendingDrawings {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a new drawing and return its position in the buffer.
    pub fn push(&mut self, drawing: DrawingBlob) -> usize {
        self.drawings.push(drawing);
        self.drawings.len() - 1
    }

    /// Replace a buffered drawing. Returns `false` if `index` is out of range.
    pub fn replace(&mut self, index: usize, drawing: DrawingBlob) -> bool {
        match self.drawings.get_mut(index) {
            Some(slot) => {
                *slot = drawing;
                true
            }
            None => false,
        }
    }

    /// Remove a buffered drawing. Returns `None` if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Option<DrawingBlob> {
        (index < self.drawings.len()).then(|| self.drawings.remove(index))
    }

    /// Get a buffered drawing.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DrawingBlob> {
        self.drawings.get(index)
    }

    /// Buffered drawings in order.
    #[must_use]
    pub fn drawings(&self) -> &[DrawingBlob] {
        &self.drawings
    }

    /// Number of buffered drawings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    /// Check if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    /// Whether the buffer has already been handed over for merging.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    /// Take every buffered drawing for merging into the opened model.
    ///
    /// Returns `Some` exactly once; every later call returns `None`, so a
    /// repeated open signal can never merge the same drawings twice.
    pub fn take_for_merge(&mut self) -> Option<Vec<DrawingBlob>> {
        if self.merged {
            return None;
        }
        self.merged = true;
        Some(std::mem::take(&mut self.drawings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(tag: u8) -> DrawingBlob {
        DrawingBlob::new(vec![tag])
    }

    #[test]
    fn test_push_and_replace() {
        let mut pending = PendingDrawings::new();
        assert_eq!(pending.push(blob(1)), 0);
        assert_eq!(pending.push(blob(2)), 1);
        assert!(pending.replace(1, blob(3)));
        assert!(!pending.replace(2, blob(4)));
        assert_eq!(pending.get(1), Some(&blob(3)));
    }

    #[test]
    fn test_take_for_merge_only_once() {
        let mut pending = PendingDrawings::new();
        pending.push(blob(1));
        pending.push(blob(2));

        let taken = pending.take_for_merge().expect("first merge");
        assert_eq!(taken, vec![blob(1), blob(2)]);
        assert!(pending.is_empty());
        assert!(pending.is_merged());
        assert!(pending.take_for_merge().is_none());
    }

    #[test]
    fn test_take_for_merge_when_empty() {
        let mut pending = PendingDrawings::new();
        assert_eq!(pending.take_for_merge(), Some(Vec::new()));
        assert!(pending.take_for_merge().is_none());
    }
}
