//! Authoritative owner of the document model and its thumbnails.
//!
//! [`ModelController`] lives on the coordination context (the task that owns
//! it). Mutations apply to the model immediately. Thumbnail renders run on
//! blocking worker threads and persistence runs on the serialization task;
//! both report back over channels and their results are only applied when
//! the owner calls [`ModelController::pump`] or [`ModelController::settle`].
//! Observers are therefore never called while a render or write is half
//! applied.

use std::sync::Arc;

use inkbook_core::{Bounds, DocumentModel, DrawingBlob, Ink, ModelEvent, RenderContext};
use inkbook_render::{DrawingRenderer, RasterImage, RenderTicket, ThumbnailCache, ThumbnailGeometry};
use tokio::sync::mpsc;

use crate::error::{SyncError, SyncResult};
use crate::storage::{current_timestamp_ms, DocumentStore};
use crate::writer::{PersistWorker, WriteMode, WriteReport, WriteTicket};

/// Handle returned by [`ModelController::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&ModelEvent) + Send>;

/// A finished (or failed) thumbnail render.
struct RenderDone {
    ticket: RenderTicket,
    result: Result<RasterImage, String>,
}

/// Result waiting on either background context.
enum Completion {
    Render(RenderDone),
    Write(WriteReport),
}

/// Owns the [`DocumentModel`] and its [`ThumbnailCache`].
pub struct ModelController {
    model: DocumentModel,
    thumbnails: ThumbnailCache,
    geometry: ThumbnailGeometry,
    renderer: Arc<dyn DrawingRenderer>,
    render_tx: mpsc::UnboundedSender<RenderDone>,
    render_rx: mpsc::UnboundedReceiver<RenderDone>,
    renders_in_flight: usize,
    writer: PersistWorker,
    write_rx: mpsc::UnboundedReceiver<WriteReport>,
    writes_in_flight: usize,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
    modified_ms: u64,
    /// Count of local edits, and the count covered by the newest write that
    /// reached storage.
    edits: u64,
    saved_edits: u64,
    queued_writes: Vec<(WriteTicket, u64)>,
}

impl std::fmt::Debug for ModelController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelController")
            .field("drawings", &self.model.len())
            .field("thumbnails", &self.thumbnails.len())
            .field("renders_in_flight", &self.renders_in_flight)
            .field("writes_in_flight", &self.writes_in_flight)
            .field("observers", &self.observers.len())
            .field("unsaved", &self.has_unsaved_changes())
            .finish_non_exhaustive()
    }
}

impl ModelController {
    /// Create a controller with an empty model.
    ///
    /// Spawns the serialization task, so this must be called from within a
    /// tokio runtime.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn DrawingRenderer>,
        geometry: ThumbnailGeometry,
        context: RenderContext,
    ) -> Self {
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let (report_tx, write_rx) = mpsc::unbounded_channel();
        Self {
            model: DocumentModel::new(),
            thumbnails: ThumbnailCache::new(context),
            geometry,
            renderer,
            render_tx,
            render_rx,
            renders_in_flight: 0,
            writer: PersistWorker::spawn(store, report_tx),
            write_rx,
            writes_in_flight: 0,
            observers: Vec::new(),
            next_observer: 0,
            modified_ms: 0,
            edits: 0,
            saved_edits: 0,
            queued_writes: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The current model.
    #[must_use]
    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    /// Number of drawings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.model.len()
    }

    /// Check if the model has no drawings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    /// Drawing at `index`.
    #[must_use]
    pub fn drawing(&self, index: usize) -> Option<&DrawingBlob> {
        self.model.get(index)
    }

    /// Thumbnail at `index`, `None` while only a placeholder exists.
    #[must_use]
    pub fn thumbnail(&self, index: usize) -> Option<&RasterImage> {
        self.thumbnails.get(index)
    }

    /// The thumbnail cache.
    #[must_use]
    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Render context the thumbnails are produced for.
    #[must_use]
    pub fn render_context(&self) -> RenderContext {
        self.thumbnails.context()
    }

    /// Thumbnail geometry.
    #[must_use]
    pub fn geometry(&self) -> ThumbnailGeometry {
        self.geometry
    }

    /// Modification time of the in-memory model, in milliseconds.
    ///
    /// The stored time after a load, the wall clock after a local edit.
    #[must_use]
    pub fn modified_ms(&self) -> u64 {
        self.modified_ms
    }

    /// Check if the model holds edits no successful write has covered yet.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.saved_edits < self.edits
    }

    /// Check if no render or write is outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.renders_in_flight == 0 && self.writes_in_flight == 0
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Replace the drawing at `index` and schedule its thumbnail.
    ///
    /// Returns `false` (changing nothing) if `index` is out of range.
    pub fn replace(&mut self, index: usize, drawing: DrawingBlob) -> bool {
        if self.model.replace(index, drawing).is_none() {
            return false;
        }
        self.touch();
        if let Some(ticket) = self.thumbnails.mark_stale(index) {
            self.schedule_render(ticket);
        }
        self.notify(&ModelEvent::DrawingReplaced { index });
        true
    }

    /// Append a drawing with a placeholder thumbnail. Returns its index.
    pub fn append(&mut self, drawing: DrawingBlob) -> usize {
        let index = self.model.push(drawing);
        self.touch();
        let ticket = self.thumbnails.push_placeholder();
        self.schedule_render(ticket);
        self.notify(&ModelEvent::DrawingAppended { index });
        index
    }

    /// Remove the drawing at `index` together with its thumbnail.
    ///
    /// Later thumbnails shift down without re-rendering. Out-of-range
    /// indices are ignored and return `false`.
    pub fn remove_at(&mut self, index: usize) -> bool {
        if self.model.remove(index).is_none() {
            tracing::debug!(index, len = self.model.len(), "Ignoring out-of-range removal");
            return false;
        }
        self.thumbnails.remove(index);
        self.touch();
        self.notify(&ModelEvent::DrawingRemoved { index });
        true
    }

    /// Drop every thumbnail and re-render all of them for `context`.
    pub fn regenerate_all(&mut self, context: RenderContext) {
        let tickets = self.thumbnails.invalidate_all(context);
        tracing::debug!(count = tickets.len(), ?context, "Regenerating all thumbnails");
        for ticket in tickets {
            self.schedule_render(ticket);
        }
        self.notify(&ModelEvent::ThumbnailsInvalidated);
    }

    /// Swap in another model and rebuild the thumbnails.
    ///
    /// Does not change whether the model counts as saved; see
    /// [`mark_saved`](Self::mark_saved).
    pub fn replace_model(&mut self, model: DocumentModel, modified_ms: u64) {
        let len = model.len();
        self.model = model;
        self.modified_ms = modified_ms;
        for ticket in self.thumbnails.reset(len) {
            self.schedule_render(ticket);
        }
        self.notify(&ModelEvent::ModelReplaced { len });
    }

    fn touch(&mut self) {
        self.modified_ms = current_timestamp_ms();
        self.edits += 1;
    }

    /// The model matches what storage holds.
    pub(crate) fn mark_saved(&mut self) {
        self.saved_edits = self.edits;
    }

    /// The model differs from storage without a local edit, e.g. after
    /// conflict resolution picked another version.
    pub(crate) fn mark_unsaved(&mut self) {
        self.edits += 1;
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Queue a write of the model as it is right now.
    ///
    /// The snapshot is taken before this returns, so later mutations never
    /// leak into it. The outcome arrives as a [`WriteReport`] from
    /// [`pump`](Self::pump) or [`settle`](Self::settle).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Task`] if the serialization task has stopped.
    pub fn persist(&mut self) -> SyncResult<WriteTicket> {
        self.submit(WriteMode::Plain)
    }

    /// Queue a write that also discards the conflicting versions `discard`.
    pub(crate) fn persist_resolving(&mut self, discard: Vec<String>) -> SyncResult<WriteTicket> {
        self.submit(WriteMode::ResolveConflicts(discard))
    }

    fn submit(&mut self, mode: WriteMode) -> SyncResult<WriteTicket> {
        let ticket = self
            .writer
            .submit(self.model.clone(), mode)
            .ok_or_else(|| SyncError::Task("serialization task stopped".to_string()))?;
        self.writes_in_flight += 1;
        self.queued_writes.push((ticket, self.edits));
        tracing::debug!(
            ticket = ticket.value(),
            drawings = self.model.len(),
            "Queued document snapshot"
        );
        Ok(ticket)
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn schedule_render(&mut self, ticket: RenderTicket) {
        let Some(drawing) = self.model.get(ticket.index).cloned() else {
            return;
        };
        let renderer = Arc::clone(&self.renderer);
        let bounds = self.geometry.content_bounds();
        let context = self.thumbnails.context();
        let scale = self.geometry.scale(&context);
        let tx = self.render_tx.clone();
        self.renders_in_flight += 1;

        tokio::spawn(async move {
            let joined = tokio::task::spawn_blocking(move || {
                renderer.render(&drawing, bounds, scale, context.appearance)
            })
            .await;
            let result = match joined {
                Ok(rendered) => rendered.map_err(|e| e.to_string()),
                Err(e) => Err(format!("render task failed: {e}")),
            };
            // Receiver is gone only when the controller was dropped.
            let _ = tx.send(RenderDone { ticket, result });
        });
    }

    /// Render the drawing at `index` at its own ink bounds and full pixel
    /// density, for sharing. Drawings without ink render the page area.
    ///
    /// Returns `Ok(None)` if `index` is out of range.
    ///
    /// # Errors
    ///
    /// Returns an error if the drawing cannot be decoded or rendered.
    pub async fn render_full(&self, index: usize) -> SyncResult<Option<RasterImage>> {
        let Some(drawing) = self.model.get(index).cloned() else {
            return Ok(None);
        };
        let ink = Ink::from_blob(&drawing)?;
        let bounds = share_bounds(&ink, self.geometry.content_bounds());
        let context = self.thumbnails.context();
        let renderer = Arc::clone(&self.renderer);

        let image = tokio::task::spawn_blocking(move || {
            renderer.render(&drawing, bounds, context.pixel_density, context.appearance)
        })
        .await??;
        Ok(Some(image))
    }

    // -----------------------------------------------------------------------
    // Completion handling
    // -----------------------------------------------------------------------

    /// Apply every render and write that has finished, without waiting.
    ///
    /// Returns the write reports that arrived.
    pub fn pump(&mut self) -> Vec<WriteReport> {
        let mut reports = Vec::new();
        while let Ok(done) = self.render_rx.try_recv() {
            self.complete(Completion::Render(done), &mut reports);
        }
        while let Ok(report) = self.write_rx.try_recv() {
            self.complete(Completion::Write(report), &mut reports);
        }
        reports
    }

    /// Wait until every outstanding render and write has finished, applying
    /// results as they arrive.
    ///
    /// Returns the write reports that arrived.
    pub async fn settle(&mut self) -> Vec<WriteReport> {
        let mut reports = self.pump();
        while !self.is_settled() {
            let renders_pending = self.renders_in_flight > 0;
            let writes_pending = self.writes_in_flight > 0;
            let next = tokio::select! {
                Some(done) = self.render_rx.recv(), if renders_pending => Completion::Render(done),
                Some(report) = self.write_rx.recv(), if writes_pending => Completion::Write(report),
                else => break,
            };
            self.complete(next, &mut reports);
        }
        reports
    }

    fn complete(&mut self, completion: Completion, reports: &mut Vec<WriteReport>) {
        match completion {
            Completion::Render(done) => {
                self.renders_in_flight = self.renders_in_flight.saturating_sub(1);
                self.apply_render(done);
            }
            Completion::Write(report) => {
                self.writes_in_flight = self.writes_in_flight.saturating_sub(1);
                let queued = self.queued_writes.iter().position(|(t, _)| *t == report.ticket);
                if let Some(pos) = queued {
                    let (_, edits) = self.queued_writes.swap_remove(pos);
                    if report.is_ok() {
                        self.saved_edits = self.saved_edits.max(edits);
                    }
                }
                reports.push(report);
            }
        }
    }

    fn apply_render(&mut self, done: RenderDone) {
        let RenderDone { ticket, result } = done;
        match result {
            Ok(image) => {
                match self.thumbnails.apply(ticket.index, ticket.generation, image) {
                    Some(index) => self.notify(&ModelEvent::ThumbnailUpdated { index }),
                    None => tracing::debug!(
                        index = ticket.index,
                        generation = ticket.generation.value(),
                        "Discarding superseded thumbnail"
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(index = ticket.index, "Thumbnail render failed: {e}");
                self.thumbnails.fail(ticket.generation);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Register a callback for settled model and thumbnail changes.
    ///
    /// Callbacks run synchronously on the coordination context.
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&ModelEvent) + Send + 'static,
    {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &ModelEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }
}

/// Area to render when sharing: the ink's own bounds, or the page area for a
/// drawing with no ink.
fn share_bounds(ink: &Ink, page: Bounds) -> Bounds {
    let bounds = ink.bounds();
    if bounds.is_empty() {
        page
    } else {
        bounds
    }
}
