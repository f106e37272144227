//! Durable document storage.
//!
//! A [`DocumentStore`] holds the bytes of one document at a fixed location.
//! Stores backed by a synced folder may also hold conflicting versions left
//! behind by other devices; those are surfaced through
//! [`DocumentStore::conflict_versions`], each with an id, and cleared one by
//! one through [`DocumentStore::resolve_conflicts`]. A version that shows up
//! after the caller looked is never discarded with the others.
//!
//! Store methods block. The sync pipeline only calls them from blocking worker
//! threads, never from the coordination context.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{SyncError, SyncResult};

/// Default document file name.
pub const DEFAULT_DOCUMENT_NAME: &str = "notes.inkbook";

/// Marker separating a document name from a conflict copy's tag.
pub const CONFLICT_MARKER: &str = ".conflict-";

/// Bytes of one stored version plus its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    /// Raw document bytes.
    pub bytes: Vec<u8>,
    /// Modification time in milliseconds since the epoch.
    pub modified_ms: u64,
}

/// A conflicting version parked next to the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictVersion {
    /// Store-specific identity of the version.
    pub id: String,
    /// Bytes and modification time.
    pub version: StoredVersion,
}

/// Byte-oriented store for a single document.
pub trait DocumentStore: Send + Sync {
    /// Check if the document exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be inspected.
    fn exists(&self) -> SyncResult<bool>;

    /// Read the current version.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing or unreadable.
    fn read(&self) -> SyncResult<StoredVersion>;

    /// Atomically replace the current version, returning its new revision.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Write`] if the bytes could not be stored; the
    /// previous version is left intact.
    fn write(&self, bytes: &[u8]) -> SyncResult<u64>;

    /// Opaque revision of the current version, `None` if absent.
    ///
    /// Changes whenever the current version is replaced, by this process or
    /// by anyone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be inspected.
    fn revision(&self) -> SyncResult<Option<u64>>;

    /// Versions that diverged from the current one, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be inspected.
    fn conflict_versions(&self) -> SyncResult<Vec<ConflictVersion>>;

    /// Write the resolved version and discard the conflicting versions whose
    /// ids are listed in `discard`. Other conflicting versions are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; conflicting versions are then
    /// kept.
    fn resolve_conflicts(&self, bytes: &[u8], discard: &[String]) -> SyncResult<u64>;
}

/// Current time in milliseconds since the epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Document stored as a file, typically inside a cloud-synced folder.
///
/// Conflict copies are sibling files named `<document><CONFLICT_MARKER><tag>`,
/// the way sync clients park versions they could not merge.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store [`DEFAULT_DOCUMENT_NAME`] inside `dir`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the directory cannot be created.
    pub fn in_dir(dir: impl AsRef<Path>) -> SyncResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self::new(dir.join(DEFAULT_DOCUMENT_NAME)))
    }

    /// Path of the document file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path a conflict copy with the given tag would have.
    #[must_use]
    pub fn conflict_path(&self, tag: &str) -> PathBuf {
        let mut name = self.file_name();
        name.push_str(CONFLICT_MARKER);
        name.push_str(tag);
        self.dir().join(name)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string())
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn conflict_files(&self) -> SyncResult<Vec<PathBuf>> {
        let prefix = format!("{}{CONFLICT_MARKER}", self.file_name());
        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) && entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn read_version(path: &Path) -> SyncResult<StoredVersion> {
        let bytes = fs::read(path)?;
        let modified_ms = modified_ms(&fs::metadata(path)?);
        Ok(StoredVersion { bytes, modified_ms })
    }

    fn write_atomic(&self, bytes: &[u8]) -> std::io::Result<u64> {
        let tmp = self
            .dir()
            .join(format!(".{}.{}.tmp", self.file_name(), uuid::Uuid::new_v4()));
        if let Err(e) = write_and_rename(&tmp, &self.path, bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(revision_of(&fs::metadata(&self.path)?))
    }
}

fn write_and_rename(tmp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(tmp, dest)
}

/// Conflict copies are identified by their file name.
fn conflict_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[allow(clippy::cast_possible_truncation)]
fn modified_ms(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis() as u64)
}

#[allow(clippy::cast_possible_truncation)]
fn revision_of(meta: &fs::Metadata) -> u64 {
    let nanos = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos() as u64);
    nanos ^ meta.len().rotate_left(48)
}

impl DocumentStore for FileStore {
    fn exists(&self) -> SyncResult<bool> {
        Ok(self.path.try_exists()?)
    }

    fn read(&self) -> SyncResult<StoredVersion> {
        Self::read_version(&self.path)
    }

    fn write(&self, bytes: &[u8]) -> SyncResult<u64> {
        self.write_atomic(bytes).map_err(|e| {
            SyncError::Write(format!("{}: {e}", self.path.display()))
        })
    }

    fn revision(&self) -> SyncResult<Option<u64>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(revision_of(&meta))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn conflict_versions(&self) -> SyncResult<Vec<ConflictVersion>> {
        self.conflict_files()?
            .iter()
            .map(|path| {
                Ok(ConflictVersion {
                    id: conflict_id(path),
                    version: Self::read_version(path)?,
                })
            })
            .collect()
    }

    fn resolve_conflicts(&self, bytes: &[u8], discard: &[String]) -> SyncResult<u64> {
        let revision = self.write(bytes)?;
        for path in self.conflict_files()? {
            if !discard.contains(&conflict_id(&path)) {
                tracing::debug!("Keeping unresolved conflict copy {}", path.display());
                continue;
            }
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to discard conflict copy {}: {e}", path.display());
            }
        }
        Ok(revision)
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    current: Option<StoredVersion>,
    revision: u64,
    conflicts: Vec<ConflictVersion>,
    next_conflict: u64,
    fail_writes: bool,
    writes: usize,
}

/// In-memory store with fault injection, for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `bytes`, modified at `modified_ms`.
    #[must_use]
    pub fn with_version(bytes: impl Into<Vec<u8>>, modified_ms: u64) -> Self {
        let store = Self::new();
        store.replace_externally(bytes, modified_ms);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current bytes, if any.
    #[must_use]
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.lock().current.as_ref().map(|v| v.bytes.clone())
    }

    /// Number of successful writes made through the store interface.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Make every following write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Park a conflicting version, as another device's sync would.
    pub fn inject_conflict(&self, bytes: impl Into<Vec<u8>>, modified_ms: u64) {
        let mut inner = self.lock();
        inner.next_conflict += 1;
        let id = format!("conflict-{}", inner.next_conflict);
        inner.conflicts.push(ConflictVersion {
            id,
            version: StoredVersion {
                bytes: bytes.into(),
                modified_ms,
            },
        });
    }

    /// Replace the current version from outside this process.
    pub fn replace_externally(&self, bytes: impl Into<Vec<u8>>, modified_ms: u64) {
        let mut inner = self.lock();
        inner.revision += 1;
        inner.current = Some(StoredVersion {
            bytes: bytes.into(),
            modified_ms,
        });
    }

    fn store(inner: &mut MemoryInner, bytes: &[u8]) -> SyncResult<u64> {
        if inner.fail_writes {
            return Err(SyncError::Write("memory store rejected write".into()));
        }
        inner.revision += 1;
        inner.writes += 1;
        inner.current = Some(StoredVersion {
            bytes: bytes.to_vec(),
            modified_ms: current_timestamp_ms(),
        });
        Ok(inner.revision)
    }
}

impl DocumentStore for MemoryStore {
    fn exists(&self) -> SyncResult<bool> {
        Ok(self.lock().current.is_some())
    }

    fn read(&self) -> SyncResult<StoredVersion> {
        self.lock()
            .current
            .clone()
            .ok_or_else(|| SyncError::Storage("document not found".into()))
    }

    fn write(&self, bytes: &[u8]) -> SyncResult<u64> {
        Self::store(&mut self.lock(), bytes)
    }

    fn revision(&self) -> SyncResult<Option<u64>> {
        let inner = self.lock();
        Ok(inner.current.as_ref().map(|_| inner.revision))
    }

    fn conflict_versions(&self) -> SyncResult<Vec<ConflictVersion>> {
        Ok(self.lock().conflicts.clone())
    }

    fn resolve_conflicts(&self, bytes: &[u8], discard: &[String]) -> SyncResult<u64> {
        let mut inner = self.lock();
        let revision = Self::store(&mut inner, bytes)?;
        inner.conflicts.retain(|c| !discard.contains(&c.id));
        Ok(revision)
    }
}
