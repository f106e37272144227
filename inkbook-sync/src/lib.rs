//! # Inkbook Sync
//!
//! Keeps a notebook's in-memory model, its thumbnails and its stored file
//! consistent.
//!
//! ## Contexts
//!
//! ```text
//! ┌──────────────────────────┐   render jobs   ┌─────────────────────┐
//! │   coordination context   │ ──────────────▶ │ blocking render     │
//! │  CollectionCoordinator   │ ◀────────────── │ threads             │
//! │  └─ DocumentSync         │   thumbnails    └─────────────────────┘
//! │     └─ ModelController   │   snapshots     ┌─────────────────────┐
//! │                          │ ──────────────▶ │ serialization task  │
//! │                          │ ◀────────────── │ (one write at once) │
//! └──────────────────────────┘   reports       └─────────────────────┘
//! ```
//!
//! Only the coordination context touches the model, the thumbnail cache or
//! the document state. Background results are applied when it calls `pump`
//! or `settle`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod storage;
pub mod writer;

pub use controller::{ModelController, ObserverId};
pub use coordinator::CollectionCoordinator;
pub use document::{DocumentSync, OpenSummary, StorageChange, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use storage::{
    current_timestamp_ms, ConflictVersion, DocumentStore, FileStore, MemoryStore, StoredVersion,
    CONFLICT_MARKER, DEFAULT_DOCUMENT_NAME,
};
pub use writer::{WriteReport, WriteTicket};
