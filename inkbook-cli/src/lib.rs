//! # Inkbook CLI
//!
//! Headless host for an Inkbook notebook. Each invocation opens the notebook,
//! performs one action through the collection coordinator, waits for writes
//! and thumbnails to settle, and closes it again.
//!
//! ## Usage
//!
//! ```bash
//! inkbook add page.json
//! inkbook --data-dir ~/Sync/notes list --json
//! inkbook thumbnails ./thumbs --appearance dark
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved data directory, settings file and render context
//! - `commands::run` - Executes one [`Command`] against the notebook

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use inkbook_core::{Appearance, ConflictStrategy, CoreError, RenderContext, SETTINGS_FILE_NAME};
use inkbook_render::RenderError;
use inkbook_sync::{SyncError, DEFAULT_DOCUMENT_NAME};
use thiserror::Error;

/// Errors reported by the command-line host.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command line was well-formed but cannot be carried out.
    #[error("{0}")]
    Usage(String),

    /// The notebook could not be synced.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A core operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Rendering or encoding failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Output could not be produced.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Command-line arguments for inkbook.
#[derive(Debug, Clone, Parser)]
#[command(name = "inkbook")]
#[command(about = "Drawing notebook with autosave, conflict resolution and thumbnails")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding the notebook file
    #[arg(long, global = true, env = "INKBOOK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "INKBOOK_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Display appearance thumbnails are rendered for
    #[arg(long, global = true, env = "INKBOOK_APPEARANCE", default_value = "light")]
    pub appearance: Appearance,

    /// Device pixels per point
    #[arg(long, global = true, default_value = "2.0")]
    pub density: f32,

    /// Keep drawings from every conflicting version instead of the newest only
    #[arg(long, global = true)]
    pub union: bool,

    /// Action to perform
    #[command(subcommand)]
    pub command: Command,
}

/// Autosave switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Enable autosave.
    On,
    /// Disable autosave.
    Off,
}

/// Notebook actions.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// List drawings and document state
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Append a drawing from an ink JSON file
    Add {
        /// Ink JSON file
        file: PathBuf,
        /// Persist through the autosave path
        #[arg(long)]
        autosave: bool,
    },
    /// Replace the drawing at an index with an ink JSON file
    Replace {
        /// Drawing index
        index: usize,
        /// Ink JSON file
        file: PathBuf,
        /// Persist through the autosave path
        #[arg(long)]
        autosave: bool,
    },
    /// Duplicate a drawing
    Copy {
        /// Drawing index
        index: usize,
    },
    /// Delete a drawing
    Delete {
        /// Drawing index
        index: usize,
    },
    /// Show or set the autosave preference
    Autosave {
        /// New setting; omit to show the current one
        #[arg(value_enum)]
        switch: Option<Switch>,
    },
    /// Write every thumbnail as PNG
    Thumbnails {
        /// Output directory
        out_dir: PathBuf,
    },
    /// Save, then export one drawing at full resolution as PNG
    Share {
        /// Drawing index
        index: usize,
        /// Output PNG file
        out: PathBuf,
    },
    /// Resolve conflicting versions left by other devices
    Resolve,
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Directory holding the notebook file.
    pub data_dir: PathBuf,
    /// Settings file; `None` uses the platform config directory.
    pub settings_path: Option<PathBuf>,
    /// Render context for thumbnails and exports.
    pub render_context: RenderContext,
    /// Conflict policy.
    pub conflict_strategy: ConflictStrategy,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CliConfig {
    /// Configuration with platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_dir: default_data_dir(),
            settings_path: None,
            render_context: RenderContext::default(),
            conflict_strategy: ConflictStrategy::default(),
        }
    }

    /// Notebook file path.
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_DOCUMENT_NAME)
    }

    /// Settings file path, falling back to the platform config directory and
    /// then to the data directory.
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .map(|d| d.join("inkbook"))
                .unwrap_or_else(|| self.data_dir.clone())
                .join(SETTINGS_FILE_NAME)
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("inkbook"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            data_dir: args.data_dir.clone().unwrap_or_else(default_data_dir),
            settings_path: args.settings.clone(),
            render_context: RenderContext::new(args.appearance, args.density),
            conflict_strategy: if args.union {
                ConflictStrategy::Union
            } else {
                ConflictStrategy::MostRecentWins
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_resolve_into_config() {
        let args = CliArgs::parse_from([
            "inkbook",
            "--data-dir",
            "/tmp/notes",
            "--appearance",
            "dark",
            "--union",
            "copy",
            "3",
        ]);
        assert_eq!(args.command, Command::Copy { index: 3 });

        let config = CliConfig::from(&args);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.render_context.appearance, Appearance::Dark);
        assert_eq!(config.conflict_strategy, ConflictStrategy::Union);
        assert_eq!(
            config.document_path(),
            PathBuf::from("/tmp/notes").join(DEFAULT_DOCUMENT_NAME)
        );
    }

    #[test]
    fn test_autosave_switch_is_optional() {
        let args = CliArgs::parse_from(["inkbook", "autosave"]);
        assert_eq!(args.command, Command::Autosave { switch: None });
        let args = CliArgs::parse_from(["inkbook", "autosave", "off"]);
        assert_eq!(
            args.command,
            Command::Autosave {
                switch: Some(Switch::Off)
            }
        );
    }
}
