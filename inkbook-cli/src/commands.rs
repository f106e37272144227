//! Command execution.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use inkbook_core::{AutosavePreference, DrawingBlob, Ink, Settings};
use inkbook_render::InkRenderer;
use inkbook_sync::{CollectionCoordinator, DocumentSync, FileStore, SyncConfig, SyncError};
use serde::Serialize;

use crate::{CliConfig, CliError, CliResult, Command, Switch};

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawingSummary {
    /// Position in the notebook.
    pub index: usize,
    /// Encoded size.
    pub bytes: usize,
    /// Stroke count, `None` for drawings that are not ink.
    pub strokes: Option<usize>,
}

/// `list --json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListOutput {
    /// Document state, e.g. `open` or `open+save-error`.
    pub state: String,
    /// Whether autosave is enabled.
    pub autosave: bool,
    /// Every drawing in order.
    pub drawings: Vec<DrawingSummary>,
}

fn autosave_preference(config: &CliConfig) -> AutosavePreference {
    AutosavePreference::new(Arc::new(Settings::open(config.settings_file())))
}

fn coordinator(config: &CliConfig) -> CliResult<CollectionCoordinator> {
    let store = FileStore::new(config.document_path());
    std::fs::create_dir_all(&config.data_dir)?;
    let sync_config = SyncConfig::default()
        .with_render_context(config.render_context)
        .with_conflict_strategy(config.conflict_strategy);
    let document = DocumentSync::new(
        Arc::new(store),
        Arc::new(InkRenderer::new()),
        autosave_preference(config),
        &sync_config,
    );
    Ok(CollectionCoordinator::new(document))
}

async fn open(config: &CliConfig) -> CliResult<CollectionCoordinator> {
    let mut coord = coordinator(config)?;
    let summary = coord.open().await?;
    if let Some(reason) = &summary.recovered_from {
        tracing::warn!("Notebook was unreadable and starts empty: {reason}");
    }
    tracing::debug!(loaded = summary.loaded, conflicts = summary.conflicts, "Notebook open");
    Ok(coord)
}

/// Settle outstanding work, close, and fail if any write failed.
async fn finish(mut coord: CollectionCoordinator) -> CliResult<()> {
    let mut reports = coord.settle().await?;
    reports.extend(coord.close().await);
    match reports.into_iter().find_map(|r| r.outcome.err()) {
        Some(reason) => Err(SyncError::Write(reason).into()),
        None => Ok(()),
    }
}

fn read_ink(file: &Path) -> CliResult<DrawingBlob> {
    let json = std::fs::read_to_string(file)?;
    Ok(Ink::from_json(&json)?.to_blob())
}

fn summarize(index: usize, drawing: &DrawingBlob) -> DrawingSummary {
    DrawingSummary {
        index,
        bytes: drawing.len(),
        strokes: Ink::from_blob(drawing).ok().map(|ink| ink.strokes.len()),
    }
}

async fn list<W: Write>(config: &CliConfig, json: bool, out: &mut W) -> CliResult<()> {
    let coord = open(config).await?;
    let listing = ListOutput {
        state: coord.state().to_string(),
        autosave: coord.document().autosave_preference().is_enabled(),
        drawings: coord
            .drawings()
            .iter()
            .enumerate()
            .map(|(i, d)| summarize(i, d))
            .collect(),
    };
    if json {
        serde_json::to_writer_pretty(&mut *out, &listing)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{} ({})", listing.state, coord.autosave_label())?;
        for d in &listing.drawings {
            match d.strokes {
                Some(n) => writeln!(out, "{:>4}  {n} strokes, {} bytes", d.index, d.bytes)?,
                None => writeln!(out, "{:>4}  opaque, {} bytes", d.index, d.bytes)?,
            }
        }
    }
    finish(coord).await
}

async fn store_drawing<W: Write>(
    config: &CliConfig,
    file: &Path,
    index: Option<usize>,
    autosave: bool,
    out: &mut W,
) -> CliResult<()> {
    let drawing = read_ink(file)?;
    let mut coord = open(config).await?;
    if let Some(index) = index.filter(|&i| i >= coord.drawing_count()) {
        return Err(CliError::Usage(format!("no drawing at index {index}")));
    }
    let stored = if autosave {
        coord.autosave_drawing(drawing, index)?
    } else {
        coord.save_drawing(drawing, index)?
    };
    match index {
        Some(_) => writeln!(out, "replaced drawing {stored}")?,
        None => writeln!(out, "added drawing {stored}")?,
    }
    finish(coord).await
}

async fn thumbnails<W: Write>(config: &CliConfig, out_dir: &Path, out: &mut W) -> CliResult<()> {
    let mut coord = open(config).await?;
    coord.settle().await?;
    std::fs::create_dir_all(out_dir)?;
    let mut written = 0;
    for index in 0..coord.drawing_count() {
        let Some(thumb) = coord.thumbnail(index) else {
            tracing::warn!(index, "No thumbnail for drawing");
            continue;
        };
        let path = out_dir.join(format!("thumbnail-{index:03}.png"));
        std::fs::write(&path, thumb.encode_png()?)?;
        written += 1;
    }
    writeln!(out, "wrote {written} thumbnails to {}", out_dir.display())?;
    finish(coord).await
}

async fn share<W: Write>(
    config: &CliConfig,
    index: usize,
    path: &Path,
    out: &mut W,
) -> CliResult<()> {
    let mut coord = open(config).await?;
    let image = coord
        .share(index)
        .await?
        .ok_or_else(|| CliError::Usage(format!("no drawing at index {index}")))?;
    std::fs::write(path, image.encode_png()?)?;
    writeln!(
        out,
        "exported drawing {index} ({}x{}) to {}",
        image.width,
        image.height,
        path.display()
    )?;
    finish(coord).await
}

async fn resolve<W: Write>(config: &CliConfig, out: &mut W) -> CliResult<()> {
    // Opening resolves conflicts as soon as they are reported.
    let mut coord = coordinator(config)?;
    let summary = coord.open().await?;
    if summary.conflicts == 0 {
        writeln!(out, "no conflicts")?;
    } else {
        writeln!(
            out,
            "resolved {} conflicting versions, {} drawings kept",
            summary.conflicts,
            coord.drawing_count()
        )?;
    }
    finish(coord).await
}

/// Execute `command`, writing human-readable results to `out`.
///
/// # Errors
///
/// Returns an error if the notebook cannot be opened, an argument refers to
/// something that does not exist, or a write fails.
pub async fn run<W: Write>(config: &CliConfig, command: &Command, out: &mut W) -> CliResult<()> {
    match command {
        Command::Autosave { switch } => {
            let pref = autosave_preference(config);
            if let Some(switch) = switch {
                pref.set_enabled(*switch == Switch::On)?;
            }
            writeln!(out, "{}", pref.label())?;
            Ok(())
        }
        Command::List { json } => list(config, *json, out).await,
        Command::Add { file, autosave } => store_drawing(config, file, None, *autosave, out).await,
        Command::Replace {
            index,
            file,
            autosave,
        } => store_drawing(config, file, Some(*index), *autosave, out).await,
        Command::Copy { index } => {
            let mut coord = open(config).await?;
            match coord.copy(*index)? {
                Some(copy) => writeln!(out, "copied drawing {index} to {copy}")?,
                None => writeln!(out, "no drawing at index {index}")?,
            }
            finish(coord).await
        }
        Command::Delete { index } => {
            let mut coord = open(config).await?;
            if coord.delete(*index)? {
                writeln!(out, "deleted drawing {index}")?;
            } else {
                writeln!(out, "no drawing at index {index}")?;
            }
            finish(coord).await
        }
        Command::Thumbnails { out_dir } => thumbnails(config, out_dir, out).await,
        Command::Share { index, out: path } => share(config, *index, path, out).await,
        Command::Resolve => resolve(config, out).await,
    }
}
