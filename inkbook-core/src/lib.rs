//! # Inkbook Core
//!
//! Core data for a drawing notebook: the opaque drawings, the document model
//! that orders them, lifecycle state, pending local edits and settings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                inkbook-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Content          │  Document               │
//! │  - DrawingBlob    │  - DocumentModel        │
//! │  - Ink / Stroke   │  - Lifecycle + flags    │
//! │                   │  - Conflict policy      │
//! ├─────────────────────────────────────────────┤
//! │  Local edits      │  Configuration          │
//! │  - Pending buffer │  - Settings store       │
//! │                   │  - Autosave preference  │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod conflict;
pub mod drawing;
pub mod error;
pub mod event;
pub mod ink;
pub mod model;
pub mod pending;
pub mod render_context;
pub mod settings;
pub mod state;

pub use conflict::{resolve_versions, ConflictStrategy, DocumentVersion};
pub use drawing::DrawingBlob;
pub use error::{CoreError, CoreResult};
pub use event::{DocumentEvent, ModelEvent};
pub use ink::{Bounds, Ink, InkPoint, Stroke};
pub use model::{DocumentModel, FORMAT_VERSION};
pub use pending::PendingDrawings;
pub use render_context::{Appearance, RenderContext};
pub use settings::{AutosavePreference, Settings, SETTINGS_FILE_NAME};
pub use state::{DocumentState, Lifecycle, StateReaction};

/// Inkbook core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
