//! User-facing orchestration of a notebook.
//!
//! [`CollectionCoordinator`] maps index-addressed user actions onto the model
//! controller and the document, buffers drawings made before the document
//! has opened, and reacts to document state changes.
//!
//! ```text
//! closed/opening:  save_drawing ──▶ PendingDrawings
//! Opening -> Open: PendingDrawings ──(once)──▶ ModelController.append
//! open:            save_drawing ──▶ ModelController ──▶ DocumentSync.save
//! ```

use inkbook_core::{
    DocumentEvent, DocumentState, DrawingBlob, ModelEvent, PendingDrawings, RenderContext,
    StateReaction,
};
use inkbook_render::RasterImage;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::controller::ObserverId;
use crate::document::{DocumentSync, OpenSummary, StorageChange};
use crate::error::{SyncError, SyncResult};
use crate::writer::{WriteReport, WriteTicket};

/// Which persistence path an edit takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persist {
    /// Always write.
    Save,
    /// Write only if autosave is enabled.
    Autosave,
}

/// Coordinates a notebook's drawings, document and pending edits.
#[derive(Debug)]
pub struct CollectionCoordinator {
    document: DocumentSync,
    events: broadcast::Receiver<DocumentEvent>,
    pending: PendingDrawings,
    selected: Option<usize>,
}

impl CollectionCoordinator {
    /// Coordinate `document`, which should still be closed.
    #[must_use]
    pub fn new(document: DocumentSync) -> Self {
        let events = document.subscribe();
        Self {
            document,
            events,
            pending: PendingDrawings::new(),
            selected: None,
        }
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &DocumentSync {
        &self.document
    }

    /// Open the document and merge drawings buffered so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be opened or the merged model
    /// cannot be queued for writing.
    pub async fn open(&mut self) -> SyncResult<OpenSummary> {
        let summary = self.document.open().await?;
        self.process_events().await?;
        Ok(summary)
    }

    /// React to every document event received so far.
    ///
    /// An open document triggers the one-time merge of pending drawings; a
    /// conflict triggers resolution. Every other state is a wait state.
    ///
    /// The merge waits while the document still has a conflict, so pending
    /// drawings land on the resolved model and never make the local version
    /// look newer than the versions it is compared with.
    ///
    /// # Errors
    ///
    /// Returns an error if merging or conflict resolution fails.
    pub async fn process_events(&mut self) -> SyncResult<()> {
        loop {
            let state = match self.events.try_recv() {
                Ok(DocumentEvent::StateChanged { state }) => state,
                Ok(_) => continue,
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Document events lagged, using current state");
                    self.document.state()
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
            };
            match state.reaction() {
                StateReaction::Reload if self.document.state().conflict => {
                    tracing::debug!("Deferring reload until the conflict is resolved");
                }
                StateReaction::Reload => self.reload()?,
                StateReaction::ResolveConflict => {
                    self.document.resolve_conflict().await?;
                }
                StateReaction::Wait => {}
            }
        }
    }

    fn reload(&mut self) -> SyncResult<()> {
        self.merge_pending()?;
        let len = self.document.controller().len();
        if self.selected.is_some_and(|i| i >= len) {
            self.selected = None;
        }
        Ok(())
    }

    fn merge_pending(&mut self) -> SyncResult<()> {
        if !self.document.is_open() {
            return Ok(());
        }
        let Some(drawings) = self.pending.take_for_merge() else {
            return Ok(());
        };
        if drawings.is_empty() {
            return Ok(());
        }

        let controller = self.document.controller_mut();
        let base = controller.len();
        let count = drawings.len();
        for drawing in drawings {
            controller.append(drawing);
        }
        self.selected = self.selected.map(|i| base + i);
        tracing::info!(count, base, "Merged drawings made before open");
        self.document.save().map(|_| ())
    }

    /// Edits go to the pending buffer until it has been merged.
    fn buffering(&self) -> bool {
        !self.pending.is_merged() && !self.document.is_open()
    }

    fn require_model(&mut self) -> SyncResult<()> {
        self.merge_pending()?;
        if self.document.is_open() {
            Ok(())
        } else {
            Err(SyncError::NotOpen)
        }
    }

    fn persist(&mut self, how: Persist) -> SyncResult<Option<WriteTicket>> {
        match how {
            Persist::Save => self.document.save().map(Some),
            Persist::Autosave => self.document.autosave(),
        }
    }

    fn place(
        &mut self,
        drawing: DrawingBlob,
        index: Option<usize>,
        how: Persist,
    ) -> SyncResult<usize> {
        if self.buffering() {
            let index = match index.filter(|&i| i < self.pending.len()) {
                Some(i) => {
                    self.pending.replace(i, drawing);
                    i
                }
                None => self.pending.push(drawing),
            };
            tracing::debug!(index, "Buffered drawing until the document opens");
            return Ok(index);
        }

        self.require_model()?;
        let controller = self.document.controller_mut();
        let index = match index.filter(|&i| i < controller.len()) {
            Some(i) => {
                controller.replace(i, drawing);
                i
            }
            None => controller.append(drawing),
        };
        self.persist(how)?;
        Ok(index)
    }

    /// Store a drawing and write the document.
    ///
    /// Replaces the drawing at `index` when it is in range, appends
    /// otherwise. Returns the drawing's index.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document was closed again after
    /// opening, or an error if the write cannot be queued.
    pub fn save_drawing(
        &mut self,
        drawing: DrawingBlob,
        index: Option<usize>,
    ) -> SyncResult<usize> {
        self.place(drawing, index, Persist::Save)
    }

    /// Like [`save_drawing`](Self::save_drawing), but writes only if autosave
    /// is enabled.
    ///
    /// # Errors
    ///
    /// Same as [`save_drawing`](Self::save_drawing).
    pub fn autosave_drawing(
        &mut self,
        drawing: DrawingBlob,
        index: Option<usize>,
    ) -> SyncResult<usize> {
        self.place(drawing, index, Persist::Autosave)
    }

    /// Append a duplicate of the drawing at `index`.
    ///
    /// Returns the copy's index, or `None` if `index` is out of range.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be queued.
    pub fn copy(&mut self, index: usize) -> SyncResult<Option<usize>> {
        if self.buffering() {
            return Ok(self
                .pending
                .get(index)
                .cloned()
                .map(|drawing| self.pending.push(drawing)));
        }

        self.require_model()?;
        let controller = self.document.controller_mut();
        let Some(drawing) = controller.drawing(index).cloned() else {
            return Ok(None);
        };
        let copy = controller.append(drawing);
        self.document.save()?;
        Ok(Some(copy))
    }

    /// Delete the drawing at `index`. Out-of-range indices are ignored.
    ///
    /// Returns whether a drawing was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be queued.
    pub fn delete(&mut self, index: usize) -> SyncResult<bool> {
        let removed = if self.buffering() {
            self.pending.remove(index).is_some()
        } else {
            self.require_model()?;
            if self.document.controller_mut().remove_at(index) {
                self.document.save()?;
                true
            } else {
                false
            }
        };

        if removed {
            self.selected = match self.selected {
                Some(i) if i == index => None,
                Some(i) if i > index => Some(i - 1),
                other => other,
            };
        }
        Ok(removed)
    }

    /// Write the document, then render the drawing at `index` at full pixel
    /// density for handing to an exporter.
    ///
    /// Returns `None` if `index` is out of range.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] before the document has opened, or an
    /// error if the drawing cannot be rendered.
    pub async fn share(&mut self, index: usize) -> SyncResult<Option<RasterImage>> {
        self.require_model()?;
        if index >= self.document.controller().len() {
            return Ok(None);
        }
        self.document.save()?;
        self.document.controller().render_full(index).await
    }

    /// Choose the drawing at `index` for editing. Returns `false` if out of
    /// range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.drawing_count() {
            return false;
        }
        self.selected = Some(index);
        true
    }

    /// Index chosen for editing, if any.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Consume the selection.
    ///
    /// The selection is cleared even if the index no longer holds a drawing.
    pub fn take_selection(&mut self) -> Option<(usize, DrawingBlob)> {
        let index = self.selected.take()?;
        self.drawing(index).cloned().map(|drawing| (index, drawing))
    }

    /// Switch the render context. Every thumbnail is regenerated, but only if
    /// the context actually changed.
    ///
    /// Returns whether a regeneration was started.
    pub fn set_render_context(&mut self, context: RenderContext) -> bool {
        let controller = self.document.controller_mut();
        if controller.render_context() == context {
            return false;
        }
        controller.regenerate_all(context);
        true
    }

    /// Number of drawings the user sees: pending ones until the document
    /// opens, the model's afterwards.
    #[must_use]
    pub fn drawing_count(&self) -> usize {
        if self.buffering() {
            self.pending.len()
        } else {
            self.document.controller().len()
        }
    }

    /// Drawing at `index`, pending or stored.
    #[must_use]
    pub fn drawing(&self, index: usize) -> Option<&DrawingBlob> {
        if self.buffering() {
            self.pending.get(index)
        } else {
            self.document.controller().drawing(index)
        }
    }

    /// Snapshot of every visible drawing in order.
    #[must_use]
    pub fn drawings(&self) -> Vec<DrawingBlob> {
        if self.buffering() {
            self.pending.drawings().to_vec()
        } else {
            self.document.controller().model().drawings().to_vec()
        }
    }

    /// Number of drawings still waiting for the document to open.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Thumbnail at `index`. Pending drawings have none.
    #[must_use]
    pub fn thumbnail(&self, index: usize) -> Option<&RasterImage> {
        self.document.controller().thumbnail(index)
    }

    /// Check if the document is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.document.is_open()
    }

    /// Current document state.
    #[must_use]
    pub fn state(&self) -> DocumentState {
        self.document.state()
    }

    /// Label for the autosave toggle.
    #[must_use]
    pub fn autosave_label(&self) -> &'static str {
        self.document.autosave_preference().label()
    }

    /// Flip the autosave preference and return the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference cannot be persisted.
    pub fn toggle_autosave(&self) -> SyncResult<bool> {
        Ok(self.document.autosave_preference().toggle()?)
    }

    /// Register a callback for settled model changes.
    pub fn on_model_change<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&ModelEvent) + Send + 'static,
    {
        self.document.controller_mut().subscribe(observer)
    }

    /// Apply finished renders and writes without waiting.
    pub fn pump(&mut self) -> Vec<WriteReport> {
        self.document.pump()
    }

    /// Wait for outstanding renders and writes, then react to the resulting
    /// state changes.
    ///
    /// # Errors
    ///
    /// Returns an error if reacting to a state change fails.
    pub async fn settle(&mut self) -> SyncResult<Vec<WriteReport>> {
        let mut reports = self.document.settle().await;
        self.process_events().await?;
        // Conflict resolution may have queued another write.
        reports.extend(self.document.settle().await);
        Ok(reports)
    }

    /// Check storage for external changes and react to them.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be inspected or reacting fails.
    pub async fn poll_storage(&mut self) -> SyncResult<StorageChange> {
        let change = self.document.poll_storage().await?;
        self.process_events().await?;
        Ok(change)
    }

    /// Resolve conflicting versions now.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not open or resolution fails.
    pub async fn resolve_conflict(&mut self) -> SyncResult<Option<WriteTicket>> {
        self.document.resolve_conflict().await
    }

    /// Settle outstanding work and close the document.
    pub async fn close(&mut self) -> Vec<WriteReport> {
        self.selected = None;
        let reports = self.document.close().await;
        // Only wait states remain; drain them.
        while !matches!(
            self.events.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ) {}
        reports
    }
}
