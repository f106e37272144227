//! The serialization context: a single task that writes snapshots in order.
//!
//! Requests queue on an unbounded channel. When the task wakes it drains the
//! queue and writes only the newest snapshot; every request drained with it
//! receives the same outcome. Writes never interleave, and each one succeeds
//! or fails as a unit against the store.

use std::sync::Arc;

use inkbook_core::DocumentModel;
use tokio::sync::mpsc;

use crate::storage::DocumentStore;

/// Identifies one persistence request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteTicket(pub(crate) u64);

impl WriteTicket {
    /// Raw ticket number. Tickets increase with submission order.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// What a write should do with conflicting versions in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Replace the current version only.
    Plain,
    /// Replace the current version and discard the listed conflicting
    /// versions.
    ResolveConflicts(Vec<String>),
}

/// Outcome of one persistence request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// The request this report answers.
    pub ticket: WriteTicket,
    /// New store revision on success, failure description otherwise.
    pub outcome: Result<u64, String>,
    /// Whether conflicting versions were discarded by this write.
    pub resolved_conflicts: bool,
    /// Number of requests folded into the same physical write.
    pub coalesced: usize,
}

impl WriteReport {
    /// Check if the write reached storage.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

struct WriteJob {
    ticket: WriteTicket,
    snapshot: DocumentModel,
    mode: WriteMode,
}

/// Handle to the serialization task.
pub(crate) struct PersistWorker {
    tx: mpsc::UnboundedSender<WriteJob>,
    next_ticket: u64,
}

impl PersistWorker {
    /// Spawn the writer task on the current tokio runtime.
    ///
    /// Reports are delivered on `reports`.
    pub(crate) fn spawn(
        store: Arc<dyn DocumentStore>,
        reports: mpsc::UnboundedSender<WriteReport>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, rx, reports));
        Self { tx, next_ticket: 0 }
    }

    /// Queue a snapshot for writing.
    ///
    /// Returns `None` if the writer task is gone.
    pub(crate) fn submit(&mut self, snapshot: DocumentModel, mode: WriteMode) -> Option<WriteTicket> {
        self.next_ticket += 1;
        let ticket = WriteTicket(self.next_ticket);
        self.tx
            .send(WriteJob {
                ticket,
                snapshot,
                mode,
            })
            .ok()
            .map(|()| ticket)
    }
}

async fn run_writer(
    store: Arc<dyn DocumentStore>,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
    reports: mpsc::UnboundedSender<WriteReport>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        let mut resolve = false;
        let mut discard: Vec<String> = Vec::new();
        for job in &batch {
            if let WriteMode::ResolveConflicts(ids) = &job.mode {
                resolve = true;
                discard.extend(ids.iter().cloned());
            }
        }
        let coalesced = batch.len();
        let Some(latest) = batch.last() else {
            continue;
        };
        let snapshot = latest.snapshot.clone();
        let newest = latest.ticket;

        let store = Arc::clone(&store);
        let outcome = tokio::task::spawn_blocking(move || {
            let bytes = snapshot.serialize().map_err(|e| e.to_string())?;
            let result = if resolve {
                store.resolve_conflicts(&bytes, &discard)
            } else {
                store.write(&bytes)
            };
            result.map_err(|e| e.to_string())
        })
        .await
        .unwrap_or_else(|e| Err(format!("writer task failed: {e}")));

        match &outcome {
            Ok(revision) => tracing::debug!(
                ticket = newest.value(),
                coalesced,
                revision,
                "Persisted document snapshot"
            ),
            Err(e) => tracing::warn!(ticket = newest.value(), coalesced, "Persist failed: {e}"),
        }

        for job in batch {
            let report = WriteReport {
                ticket: job.ticket,
                outcome: outcome.clone(),
                resolved_conflicts: resolve && outcome.is_ok(),
                coalesced,
            };
            if reports.send(report).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use inkbook_core::DrawingBlob;

    fn model(n: u8) -> DocumentModel {
        (0..n).map(|i| DrawingBlob::new(vec![i])).collect()
    }

    #[tokio::test]
    async fn test_every_request_gets_a_report() {
        let store = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut worker = PersistWorker::spawn(store.clone(), tx);

        let tickets: Vec<_> = (1..=5)
            .map(|n| worker.submit(model(n), WriteMode::Plain).expect("submit"))
            .collect();

        let mut seen = Vec::new();
        while seen.len() < tickets.len() {
            let report = rx.recv().await.expect("report");
            assert!(report.is_ok());
            seen.push(report.ticket);
        }
        assert_eq!(seen, tickets);

        let stored = DocumentModel::deserialize(&store.contents().expect("bytes")).expect("model");
        assert_eq!(stored, model(5));
        assert!(store.write_count() <= 5);
    }

    #[tokio::test]
    async fn test_resolving_write_discards_only_listed_versions() {
        let store = Arc::new(MemoryStore::new());
        store.inject_conflict(vec![1], 10);
        let seen: Vec<_> = store
            .conflict_versions()
            .expect("versions")
            .into_iter()
            .map(|c| c.id)
            .collect();
        store.inject_conflict(vec![2], 20);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut worker = PersistWorker::spawn(store.clone(), tx);
        worker
            .submit(model(1), WriteMode::ResolveConflicts(seen))
            .expect("submit");
        let report = rx.recv().await.expect("report");
        assert!(report.resolved_conflicts);

        let left = store.conflict_versions().expect("versions");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].version.bytes, vec![2]);
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut worker = PersistWorker::spawn(store, tx);

        let ticket = worker.submit(model(1), WriteMode::Plain).expect("submit");
        let report = rx.recv().await.expect("report");
        assert_eq!(report.ticket, ticket);
        assert!(report.outcome.is_err());
        assert!(!report.resolved_conflicts);
    }
}
