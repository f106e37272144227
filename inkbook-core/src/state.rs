//! Document lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the document is in its open/close lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Not opened yet (or closed again).
    #[default]
    Closed,
    /// Loading from storage.
    Opening,
    /// Loaded and accepting edits.
    Open,
}

/// What a consumer of state-changed events should do about a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateReaction {
    /// The document is open and healthy: refresh from the model.
    Reload,
    /// Storage reported conflicting versions: resolve them.
    ResolveConflict,
    /// Anything else: wait for the next change.
    Wait,
}

/// Lifecycle plus the orthogonal flags that may be raised while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentState {
    /// Lifecycle stage.
    pub lifecycle: Lifecycle,
    /// Storage holds divergent versions of the document.
    pub conflict: bool,
    /// The last write to storage failed.
    pub save_error: bool,
}

impl DocumentState {
    /// A closed document with no flags.
    #[must_use]
    pub const fn closed() -> Self {
        Self {
            lifecycle: Lifecycle::Closed,
            conflict: false,
            save_error: false,
        }
    }

    /// Check if the document has finished opening.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    /// Open with neither the conflict nor the save-error flag raised.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.is_open() && !self.conflict && !self.save_error
    }

    /// Map this state to the reaction a coordinator should take.
    ///
    /// Only a plain open document and a conflicted document call for action;
    /// every other combination is a wait state.
    #[must_use]
    pub fn reaction(&self) -> StateReaction {
        if self.is_open() && self.conflict {
            StateReaction::ResolveConflict
        } else if self.is_normal() {
            StateReaction::Reload
        } else {
            StateReaction::Wait
        }
    }

    /// `Closed -> Opening`. Returns `false` (and changes nothing) from any
    /// other lifecycle stage.
    pub fn begin_opening(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Closed {
            return false;
        }
        self.lifecycle = Lifecycle::Opening;
        true
    }

    /// `Opening -> Open`. Returns `false` from any other stage.
    pub fn finish_opening(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Opening {
            return false;
        }
        self.lifecycle = Lifecycle::Open;
        true
    }

    /// Back to `Closed`, dropping both flags. Returns `false` if already closed.
    pub fn close(&mut self) -> bool {
        if self.lifecycle == Lifecycle::Closed {
            return false;
        }
        *self = Self::closed();
        true
    }

    /// Raise the conflict flag. Only meaningful while open.
    pub fn mark_conflict(&mut self) -> bool {
        if !self.is_open() || self.conflict {
            return false;
        }
        self.conflict = true;
        true
    }

    /// Clear the conflict flag. Returns `true` if it was set.
    pub fn clear_conflict(&mut self) -> bool {
        std::mem::replace(&mut self.conflict, false)
    }

    /// Raise the save-error flag. Returns `true` if it was newly raised.
    pub fn mark_save_error(&mut self) -> bool {
        !std::mem::replace(&mut self.save_error, true)
    }

    /// Clear the save-error flag. Returns `true` if it was set.
    pub fn clear_save_error(&mut self) -> bool {
        std::mem::replace(&mut self.save_error, false)
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.lifecycle {
            Lifecycle::Closed => "closed",
            Lifecycle::Opening => "opening",
            Lifecycle::Open => "open",
        };
        f.write_str(stage)?;
        if self.conflict {
            f.write_str("+conflict")?;
        }
        if self.save_error {
            f.write_str("+save-error")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_sequence() {
        let mut state = DocumentState::closed();
        assert!(!state.finish_opening());
        assert!(state.begin_opening());
        assert!(!state.begin_opening());
        assert_eq!(state.lifecycle, Lifecycle::Opening);
        assert!(state.finish_opening());
        assert!(state.is_normal());
    }

    #[test]
    fn test_conflict_only_while_open() {
        let mut state = DocumentState::closed();
        assert!(!state.mark_conflict());
        state.begin_opening();
        state.finish_opening();
        assert!(state.mark_conflict());
        assert!(!state.mark_conflict());
        assert_eq!(state.reaction(), StateReaction::ResolveConflict);
        assert!(state.clear_conflict());
        assert_eq!(state.reaction(), StateReaction::Reload);
    }

    #[test]
    fn test_reactions_for_wait_states() {
        let mut state = DocumentState::closed();
        assert_eq!(state.reaction(), StateReaction::Wait);
        state.begin_opening();
        assert_eq!(state.reaction(), StateReaction::Wait);
        state.finish_opening();
        state.mark_save_error();
        assert_eq!(state.reaction(), StateReaction::Wait);
    }

    #[test]
    fn test_display_lists_flags() {
        let mut state = DocumentState::closed();
        state.begin_opening();
        state.finish_opening();
        state.mark_conflict();
        state.mark_save_error();
        assert_eq!(state.to_string(), "open+conflict+save-error");
    }
}
