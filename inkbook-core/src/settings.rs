//! Process-wide settings persisted as a small JSON key/value file.
//!
//! Settings survive restarts when backed by a file. The autosave toggle is the
//! only preference the sync pipeline reads, through [`AutosavePreference`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::{CoreError, CoreResult};

/// File name of the settings file inside the settings directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Application directory name under the platform config dir.
const APP_DIR_NAME: &str = "inkbook";

/// Key/value settings store.
#[derive(Debug, Default)]
pub struct Settings {
    values: RwLock<BTreeMap<String, serde_json::Value>>,
    /// Backing file, if the settings are persisted.
    path: Option<PathBuf>,
}

impl Settings {
    /// Settings that live only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open settings backed by `path`.
    ///
    /// A missing file starts empty. A corrupt file is logged and also starts
    /// empty; it is overwritten on the next change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable settings {}: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read settings {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        Self {
            values: RwLock::new(values),
            path: Some(path),
        }
    }

    /// Open settings in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Settings`] if the platform has no config dir, or
    /// [`CoreError::Io`] if the directory cannot be created.
    pub fn default_location() -> CoreResult<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CoreError::Settings("no config directory on this platform".into()))?
            .join(APP_DIR_NAME);
        std::fs::create_dir_all(&dir)?;
        Ok(Self::open(dir.join(SETTINGS_FILE_NAME)))
    }

    /// Backing file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read a boolean value.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let values = self
            .values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        values.get(key).and_then(serde_json::Value::as_bool)
    }

    /// Store a boolean value and persist the settings.
    ///
    /// The in-memory value is updated even if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written.
    pub fn set_bool(&self, key: &str, value: bool) -> CoreResult<()> {
        let snapshot = {
            let mut values = self
                .values
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            values.insert(key.to_string(), serde_json::Value::Bool(value));
            values.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, values: &BTreeMap<String, serde_json::Value>) -> CoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(values)
            .map_err(|e| CoreError::Settings(e.to_string()))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// The autosave on/off preference.
///
/// Stored negatively under [`AutosavePreference::KEY`] so that an absent key
/// (first run) means autosave is enabled.
#[derive(Debug, Clone)]
pub struct AutosavePreference {
    settings: Arc<Settings>,
}

impl AutosavePreference {
    /// Settings key holding the "autosave disabled" flag.
    pub const KEY: &'static str = "autosave.disabled";

    /// Wrap a settings store.
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// A preference backed by throwaway in-memory settings.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(Settings::in_memory()))
    }

    /// Whether autosave is enabled. Defaults to `true`.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.settings.get_bool(Self::KEY).unwrap_or(false)
    }

    /// Enable or disable autosave.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be persisted.
    pub fn set_enabled(&self, enabled: bool) -> CoreResult<()> {
        self.settings.set_bool(Self::KEY, !enabled)
    }

    /// Flip the preference and return the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be persisted.
    pub fn toggle(&self) -> CoreResult<bool> {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled)?;
        Ok(enabled)
    }

    /// Button label for the current preference.
    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.is_enabled() {
            "Autosave: On"
        } else {
            "Autosave: Off"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autosave_defaults_to_enabled() {
        let pref = AutosavePreference::in_memory();
        assert!(pref.is_enabled());
        assert_eq!(pref.label(), "Autosave: On");
    }

    #[test]
    fn test_toggle_flips_and_labels() {
        let pref = AutosavePreference::in_memory();
        assert!(!pref.toggle().expect("toggle"));
        assert_eq!(pref.label(), "Autosave: Off");
        assert!(pref.toggle().expect("toggle"));
    }

    #[test]
    fn test_preference_survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let pref = AutosavePreference::new(Arc::new(Settings::open(&path)));
            pref.set_enabled(false).expect("set");
        }

        let pref = AutosavePreference::new(Arc::new(Settings::open(&path)));
        assert!(!pref.is_enabled());
    }

    #[test]
    fn test_corrupt_settings_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, b"{{{").expect("write");

        let settings = Settings::open(&path);
        assert_eq!(settings.get_bool(AutosavePreference::KEY), None);
        settings.set_bool("other", true).expect("rewrite");
        assert_eq!(Settings::open(&path).get_bool("other"), Some(true));
    }
}
