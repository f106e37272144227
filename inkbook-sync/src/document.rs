//! Durable document on top of the model controller.
//!
//! [`DocumentSync`] loads the model from a [`DocumentStore`], decides when it
//! is written back, resolves conflicting versions and tracks the lifecycle
//! state. Every state transition is published as a
//! [`DocumentEvent::StateChanged`] on a broadcast channel.

use std::sync::Arc;

use inkbook_core::{
    resolve_versions, AutosavePreference, ConflictStrategy, DocumentEvent, DocumentModel,
    DocumentState, DocumentVersion, RenderContext,
};
use inkbook_render::{DrawingRenderer, ThumbnailGeometry};
use tokio::sync::broadcast;

use crate::controller::ModelController;
use crate::error::{SyncError, SyncResult};
use crate::storage::{ConflictVersion, DocumentStore, StoredVersion};
use crate::writer::{WriteReport, WriteTicket};

/// Capacity of the document event channel.
const EVENT_CAPACITY: usize = 256;

/// Settings for a [`DocumentSync`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// How thumbnails map onto drawings.
    pub geometry: ThumbnailGeometry,
    /// Policy for conflicting versions.
    pub conflict_strategy: ConflictStrategy,
    /// Display the thumbnails are rendered for.
    pub render_context: RenderContext,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            geometry: ThumbnailGeometry::default(),
            conflict_strategy: ConflictStrategy::default(),
            render_context: RenderContext::default(),
        }
    }
}

impl SyncConfig {
    /// Set the thumbnail geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: ThumbnailGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the conflict strategy.
    #[must_use]
    pub fn with_conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    /// Set the initial render context.
    #[must_use]
    pub fn with_render_context(mut self, context: RenderContext) -> Self {
        self.render_context = context;
        self
    }
}

/// What [`DocumentSync::open`] found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSummary {
    /// Drawings loaded from storage.
    pub loaded: usize,
    /// Why the stored bytes were discarded, if they were.
    pub recovered_from: Option<String>,
    /// Conflicting versions waiting for resolution.
    pub conflicts: usize,
}

/// Result of [`DocumentSync::poll_storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChange {
    /// Nothing changed since the last read or write.
    Unchanged,
    /// Conflicting versions appeared.
    Conflict {
        /// Versions involved, including the current one.
        versions: usize,
    },
    /// Someone else replaced the document while the model was saved, and it
    /// was reloaded.
    Reloaded {
        /// Drawings in the reloaded model.
        drawings: usize,
    },
}

/// Everything read from the store in one blocking pass.
struct Loaded {
    current: Option<StoredVersion>,
    revision: Option<u64>,
    conflicts: usize,
}

/// Candidates for conflict resolution read from the store.
struct Candidates {
    conflicts: Vec<ConflictVersion>,
    current: Option<StoredVersion>,
    revision: Option<u64>,
}

/// A document backed by durable storage.
pub struct DocumentSync {
    controller: ModelController,
    store: Arc<dyn DocumentStore>,
    autosave: AutosavePreference,
    strategy: ConflictStrategy,
    state: DocumentState,
    events: broadcast::Sender<DocumentEvent>,
    known_revision: Option<u64>,
}

impl std::fmt::Debug for DocumentSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSync")
            .field("state", &self.state)
            .field("strategy", &self.strategy)
            .field("known_revision", &self.known_revision)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

/// Run a store call on a blocking worker thread.
async fn on_store<T, F>(store: &Arc<dyn DocumentStore>, f: F) -> SyncResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn DocumentStore) -> SyncResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref())).await?
}

impl DocumentSync {
    /// Create a closed document.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn DrawingRenderer>,
        autosave: AutosavePreference,
        config: &SyncConfig,
    ) -> Self {
        let controller = ModelController::new(
            Arc::clone(&store),
            renderer,
            config.geometry,
            config.render_context,
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            controller,
            store,
            autosave,
            strategy: config.conflict_strategy,
            state: DocumentState::closed(),
            events,
            known_revision: None,
        }
    }

    /// Subscribe to document events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Check if the document has finished opening.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// The model controller.
    #[must_use]
    pub fn controller(&self) -> &ModelController {
        &self.controller
    }

    /// Mutable access to the model controller.
    pub fn controller_mut(&mut self) -> &mut ModelController {
        &mut self.controller
    }

    /// The autosave preference.
    #[must_use]
    pub fn autosave_preference(&self) -> &AutosavePreference {
        &self.autosave
    }

    /// Conflict strategy in use.
    #[must_use]
    pub fn conflict_strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    fn emit(&self, event: DocumentEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn emit_state(&self) {
        tracing::debug!(state = %self.state, "Document state changed");
        self.emit(DocumentEvent::StateChanged { state: self.state });
    }

    /// Open the document.
    ///
    /// Loads the stored model, or seeds an empty one when nothing is stored.
    /// Unreadable bytes are replaced by an empty model and reported in the
    /// summary; the document still opens.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidState`] if the document is not closed, or
    /// a storage error if the store cannot be read. On a storage error the
    /// document returns to closed.
    pub async fn open(&mut self) -> SyncResult<OpenSummary> {
        if !self.state.begin_opening() {
            return Err(SyncError::InvalidState(format!("cannot open while {}", self.state)));
        }
        self.emit_state();

        let loaded = on_store(&self.store, |store| {
            let current = if store.exists()? {
                Some(store.read()?)
            } else {
                None
            };
            Ok(Loaded {
                current,
                revision: store.revision()?,
                conflicts: store.conflict_versions()?.len(),
            })
        })
        .await;

        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Failed to load document: {e}");
                self.state.close();
                self.emit_state();
                return Err(e);
            }
        };

        let mut recovered_from = None;
        let (model, modified_ms) = match loaded.current {
            Some(version) => match DocumentModel::deserialize(&version.bytes) {
                Ok(model) => (model, version.modified_ms),
                Err(e) => {
                    tracing::warn!("Stored document unreadable, starting empty: {e}");
                    recovered_from = Some(e.to_string());
                    (DocumentModel::new(), version.modified_ms)
                }
            },
            None => (DocumentModel::new(), 0),
        };

        let count = model.len();
        self.controller.replace_model(model, modified_ms);
        self.controller.mark_saved();
        self.known_revision = loaded.revision;
        self.state.finish_opening();
        tracing::info!(drawings = count, "Document opened");
        self.emit_state();
        self.emit(DocumentEvent::Opened {
            loaded: count,
            recovered_from: recovered_from.clone(),
        });

        if loaded.conflicts > 0 {
            self.raise_conflict(loaded.conflicts + 1);
        }

        Ok(OpenSummary {
            loaded: count,
            recovered_from,
            conflicts: loaded.conflicts,
        })
    }

    fn raise_conflict(&mut self, versions: usize) {
        if self.state.mark_conflict() {
            tracing::info!(versions, "Conflicting document versions detected");
            self.emit(DocumentEvent::ConflictDetected { versions });
            self.emit_state();
        }
    }

    /// Write the model now, whatever the autosave preference says.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] before the document has opened.
    pub fn save(&mut self) -> SyncResult<WriteTicket> {
        if !self.state.is_open() {
            return Err(SyncError::NotOpen);
        }
        self.controller.persist()
    }

    /// Write the model if autosave is enabled.
    ///
    /// Returns `Ok(None)` without touching storage when autosave is off.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] before the document has opened.
    pub fn autosave(&mut self) -> SyncResult<Option<WriteTicket>> {
        if !self.state.is_open() {
            return Err(SyncError::NotOpen);
        }
        if !self.autosave.is_enabled() {
            tracing::debug!("Autosave disabled, skipping write");
            return Ok(None);
        }
        self.controller.persist().map(Some)
    }

    /// Resolve conflicting versions with the configured strategy.
    ///
    /// The in-memory model takes part as one version, and so does the stored
    /// document if someone else replaced it since we last read or wrote it.
    /// The winner replaces the model if it differs and is written back. Only
    /// the conflicting versions read here are discarded; any that appear
    /// later raise the conflict again once the write settles. Returns
    /// `Ok(None)` when there is no conflict.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] before the document has opened, or a
    /// storage error if the conflicting versions cannot be read.
    pub async fn resolve_conflict(&mut self) -> SyncResult<Option<WriteTicket>> {
        if !self.state.is_open() {
            return Err(SyncError::NotOpen);
        }
        if !self.state.conflict {
            return Ok(None);
        }
        // Our own queued writes must not count as someone else's version.
        self.settle().await;

        let candidates = on_store(&self.store, |store| {
            let revision = store.revision()?;
            let current = if revision.is_some() {
                Some(store.read()?)
            } else {
                None
            };
            Ok(Candidates {
                conflicts: store.conflict_versions()?,
                current,
                revision,
            })
        })
        .await?;

        let mut versions = vec![DocumentVersion::new(
            self.controller.model().clone(),
            self.controller.modified_ms(),
        )];
        let external = candidates
            .current
            .filter(|_| candidates.revision != self.known_revision);
        let discard: Vec<String> = candidates.conflicts.iter().map(|c| c.id.clone()).collect();
        let stored = external
            .into_iter()
            .chain(candidates.conflicts.into_iter().map(|c| c.version));
        for version in stored {
            match DocumentModel::deserialize(&version.bytes) {
                Ok(model) => versions.push(DocumentVersion::new(model, version.modified_ms)),
                Err(e) => tracing::warn!("Skipping unreadable conflict version: {e}"),
            }
        }

        let Some(resolved) = resolve_versions(&versions, self.strategy) else {
            return Ok(None);
        };
        let winner_ms = versions
            .iter()
            .map(|v| v.modified_ms)
            .max()
            .unwrap_or_default();
        if &resolved != self.controller.model() {
            self.controller.replace_model(resolved, winner_ms);
            self.controller.mark_unsaved();
        }

        let ticket = self.controller.persist_resolving(discard)?;
        self.state.clear_conflict();
        let drawings = self.controller.len();
        tracing::info!(
            drawings,
            versions = versions.len(),
            strategy = ?self.strategy,
            "Resolved document conflict"
        );
        self.emit(DocumentEvent::ConflictResolved { drawings });
        self.emit_state();
        Ok(Some(ticket))
    }

    /// Look for changes other processes made to the stored document.
    ///
    /// Outstanding writes are settled first so that our own writes are not
    /// mistaken for external ones. Conflicting versions raise the conflict
    /// flag. A replaced document is reloaded whole if the model has no
    /// unsaved edits; otherwise it raises the conflict flag and takes part
    /// in [`resolve_conflict`](Self::resolve_conflict).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] before the document has opened, or a
    /// storage error if the store cannot be inspected.
    pub async fn poll_storage(&mut self) -> SyncResult<StorageChange> {
        if !self.state.is_open() {
            return Err(SyncError::NotOpen);
        }
        self.settle().await;

        let (conflicts, revision) = on_store(&self.store, |store| {
            Ok((store.conflict_versions()?.len(), store.revision()?))
        })
        .await?;

        let external = revision.is_some() && revision != self.known_revision;
        if conflicts > 0 || (external && self.controller.has_unsaved_changes()) {
            let versions = 1 + conflicts + usize::from(external);
            self.raise_conflict(versions);
            return Ok(StorageChange::Conflict { versions });
        }
        if !external {
            return Ok(StorageChange::Unchanged);
        }

        let version = on_store(&self.store, |store| store.read()).await?;
        self.known_revision = revision;
        match DocumentModel::deserialize(&version.bytes) {
            Ok(model) => {
                let drawings = model.len();
                tracing::info!(drawings, "Stored document changed, reloading");
                self.controller.replace_model(model, version.modified_ms);
                self.controller.mark_saved();
                self.emit_state();
                Ok(StorageChange::Reloaded { drawings })
            }
            Err(e) => {
                tracing::warn!("External document change unreadable, keeping local model: {e}");
                Ok(StorageChange::Unchanged)
            }
        }
    }

    fn handle_reports(&mut self, reports: &[WriteReport]) {
        for report in reports {
            match &report.outcome {
                Ok(revision) => {
                    self.known_revision = Some(*revision);
                    if self.state.clear_save_error() {
                        self.emit_state();
                    }
                    self.emit(DocumentEvent::Saved);
                }
                Err(reason) => {
                    if self.state.mark_save_error() {
                        self.emit_state();
                    }
                    self.emit(DocumentEvent::SaveFailed {
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    /// Apply finished renders and writes without waiting.
    pub fn pump(&mut self) -> Vec<WriteReport> {
        let reports = self.controller.pump();
        self.handle_reports(&reports);
        reports
    }

    /// Wait for every outstanding render and write.
    ///
    /// After a write that resolved conflicts, the store is checked again and
    /// versions that arrived in the meantime raise the conflict flag.
    pub async fn settle(&mut self) -> Vec<WriteReport> {
        let reports = self.controller.settle().await;
        self.handle_reports(&reports);
        if reports.iter().any(|r| r.resolved_conflicts) {
            self.recheck_conflicts().await;
        }
        reports
    }

    async fn recheck_conflicts(&mut self) {
        match on_store(&self.store, |store| Ok(store.conflict_versions()?.len())).await {
            Ok(0) => {}
            Ok(left) => self.raise_conflict(left + 1),
            Err(e) => tracing::warn!("Failed to recheck conflicting versions: {e}"),
        }
    }

    /// Settle outstanding work and close the document.
    ///
    /// Returns the write reports collected while settling.
    pub async fn close(&mut self) -> Vec<WriteReport> {
        let reports = self.settle().await;
        if self.state.close() {
            tracing::info!("Document closed");
            self.emit_state();
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use inkbook_core::{DrawingBlob, Lifecycle};
    use inkbook_render::InkRenderer;

    fn model(tags: &[u8]) -> DocumentModel {
        tags.iter().map(|t| DrawingBlob::new(vec![*t])).collect()
    }

    fn bytes(tags: &[u8]) -> Vec<u8> {
        model(tags).serialize().expect("serialize")
    }

    fn document(store: &Arc<MemoryStore>) -> DocumentSync {
        DocumentSync::new(
            store.clone(),
            Arc::new(InkRenderer::new()),
            AutosavePreference::in_memory(),
            &SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_open_empty_store_seeds_default_model() {
        let store = Arc::new(MemoryStore::new());
        let mut doc = document(&store);
        let summary = doc.open().await.expect("open");
        assert_eq!(summary.loaded, 0);
        assert!(summary.recovered_from.is_none());
        assert!(doc.state().is_normal());
        assert!(doc.open().await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_bytes_open_with_default_model() {
        let store = Arc::new(MemoryStore::with_version(b"{ not a document".to_vec(), 10));
        let mut doc = document(&store);
        let mut events = doc.subscribe();

        let summary = doc.open().await.expect("open");
        assert_eq!(summary.loaded, 0);
        assert!(summary.recovered_from.is_some());
        assert!(doc.is_open());

        let mut saw_opened = false;
        while let Ok(event) = events.try_recv() {
            if let DocumentEvent::Opened { recovered_from, .. } = event {
                assert!(recovered_from.is_some());
                saw_opened = true;
            }
        }
        assert!(saw_opened);
    }

    #[tokio::test]
    async fn test_save_before_open_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut doc = document(&store);
        assert!(matches!(doc.save(), Err(SyncError::NotOpen)));
        assert!(matches!(doc.autosave(), Err(SyncError::NotOpen)));
    }

    #[tokio::test]
    async fn test_autosave_disabled_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1]), 10));
        let mut doc = document(&store);
        doc.open().await.expect("open");
        doc.autosave_preference().set_enabled(false).expect("pref");

        doc.controller_mut().append(DrawingBlob::new(vec![2]));
        assert_eq!(doc.autosave().expect("autosave"), None);
        doc.settle().await;

        assert_eq!(store.contents(), Some(bytes(&[1])));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_sets_and_clears_save_error() {
        let store = Arc::new(MemoryStore::new());
        let mut doc = document(&store);
        doc.open().await.expect("open");

        store.set_fail_writes(true);
        doc.save().expect("queued");
        doc.settle().await;
        assert!(doc.state().save_error);
        assert_eq!(doc.state().lifecycle, Lifecycle::Open);

        store.set_fail_writes(false);
        doc.save().expect("queued");
        doc.settle().await;
        assert!(!doc.state().save_error);
    }

    #[tokio::test]
    async fn test_most_recent_version_wins() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1, 2]), 1_000));
        store.inject_conflict(bytes(&[9]), 2_000);
        let mut doc = document(&store);

        let summary = doc.open().await.expect("open");
        assert_eq!(summary.conflicts, 1);
        assert!(doc.state().conflict);

        doc.resolve_conflict().await.expect("resolve").expect("ticket");
        assert!(!doc.state().conflict);
        assert_eq!(doc.controller().model(), &model(&[9]));

        doc.settle().await;
        assert_eq!(store.contents(), Some(bytes(&[9])));
        assert!(store.conflict_versions().expect("versions").is_empty());
    }

    #[tokio::test]
    async fn test_current_version_wins_when_newer() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1, 2]), 5_000));
        store.inject_conflict(bytes(&[9]), 2_000);
        let mut doc = document(&store);
        doc.open().await.expect("open");

        doc.resolve_conflict().await.expect("resolve");
        assert_eq!(doc.controller().model(), &model(&[1, 2]));
    }

    #[tokio::test]
    async fn test_union_keeps_drawings_from_every_version() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1, 2]), 1_000));
        store.inject_conflict(bytes(&[2, 3]), 2_000);
        let mut doc = DocumentSync::new(
            store.clone(),
            Arc::new(InkRenderer::new()),
            AutosavePreference::in_memory(),
            &SyncConfig::default().with_conflict_strategy(ConflictStrategy::Union),
        );
        doc.open().await.expect("open");
        doc.resolve_conflict().await.expect("resolve");
        assert_eq!(doc.controller().model(), &model(&[2, 3, 1]));
    }

    #[tokio::test]
    async fn test_version_arriving_during_resolution_survives() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1]), 1_000));
        store.inject_conflict(bytes(&[9]), 2_000);
        let mut doc = document(&store);
        doc.open().await.expect("open");

        doc.resolve_conflict().await.expect("resolve").expect("ticket");
        store.inject_conflict(bytes(&[77]), 3_000);
        doc.settle().await;

        assert_eq!(store.contents(), Some(bytes(&[9])));
        let left = store.conflict_versions().expect("versions");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].version.bytes, bytes(&[77]));
        assert!(doc.state().conflict);

        doc.resolve_conflict().await.expect("resolve").expect("ticket");
        doc.settle().await;
        assert_eq!(doc.controller().model(), &model(&[77]));
        assert_eq!(store.contents(), Some(bytes(&[77])));
        assert!(store.conflict_versions().expect("versions").is_empty());
        assert!(!doc.state().conflict);
    }

    #[tokio::test]
    async fn test_external_replace_over_unsaved_edits_is_a_conflict() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1]), 1_000));
        let mut doc = document(&store);
        doc.open().await.expect("open");
        doc.autosave_preference().set_enabled(false).expect("pref");

        doc.controller_mut().append(DrawingBlob::new(vec![42]));
        assert_eq!(doc.autosave().expect("autosave"), None);
        store.replace_externally(bytes(&[1, 5]), 9_000);

        assert_eq!(
            doc.poll_storage().await.expect("poll"),
            StorageChange::Conflict { versions: 2 }
        );
        assert!(doc.state().conflict);
        assert_eq!(doc.controller().model(), &model(&[1, 42]));

        // The local edit is newer than the external replace.
        doc.resolve_conflict().await.expect("resolve").expect("ticket");
        doc.settle().await;
        assert_eq!(store.contents(), Some(bytes(&[1, 42])));
        assert!(!doc.controller().has_unsaved_changes());
        assert_eq!(doc.poll_storage().await.expect("poll"), StorageChange::Unchanged);
    }

    #[tokio::test]
    async fn test_union_merges_external_replace_with_unsaved_edits() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1]), 1_000));
        let mut doc = DocumentSync::new(
            store.clone(),
            Arc::new(InkRenderer::new()),
            AutosavePreference::in_memory(),
            &SyncConfig::default().with_conflict_strategy(ConflictStrategy::Union),
        );
        doc.open().await.expect("open");
        doc.controller_mut().append(DrawingBlob::new(vec![42]));
        store.replace_externally(bytes(&[1, 5]), 9_000);

        doc.poll_storage().await.expect("poll");
        doc.resolve_conflict().await.expect("resolve");
        assert_eq!(doc.controller().model(), &model(&[1, 42, 5]));
    }

    #[tokio::test]
    async fn test_resolve_without_conflict_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let mut doc = document(&store);
        doc.open().await.expect("open");
        assert_eq!(doc.resolve_conflict().await.expect("resolve"), None);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_poll_reloads_external_replace() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1]), 1_000));
        let mut doc = document(&store);
        doc.open().await.expect("open");

        doc.save().expect("queued");
        assert_eq!(doc.poll_storage().await.expect("poll"), StorageChange::Unchanged);

        store.replace_externally(bytes(&[4, 5, 6]), 9_000);
        assert_eq!(
            doc.poll_storage().await.expect("poll"),
            StorageChange::Reloaded { drawings: 3 }
        );
        assert_eq!(doc.controller().model(), &model(&[4, 5, 6]));
        assert_eq!(doc.poll_storage().await.expect("poll"), StorageChange::Unchanged);
    }

    #[tokio::test]
    async fn test_poll_detects_conflict() {
        let store = Arc::new(MemoryStore::with_version(bytes(&[1]), 1_000));
        let mut doc = document(&store);
        doc.open().await.expect("open");

        store.inject_conflict(bytes(&[2]), 3_000);
        assert_eq!(
            doc.poll_storage().await.expect("poll"),
            StorageChange::Conflict { versions: 2 }
        );
        assert!(doc.state().conflict);
    }

    #[tokio::test]
    async fn test_close_returns_to_closed() {
        let store = Arc::new(MemoryStore::new());
        let mut doc = document(&store);
        doc.open().await.expect("open");
        doc.save().expect("queued");
        let reports = doc.close().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(doc.state(), DocumentState::closed());
        assert!(matches!(doc.save(), Err(SyncError::NotOpen)));
    }
}
