//! Drive the CLI commands against a temporary notebook.

use std::path::Path;

use inkbook_cli::commands::run;
use inkbook_cli::{CliConfig, CliError, Command, Switch};
use inkbook_core::{Appearance, RenderContext};

const INK: &str = r#"{"strokes":[{"points":[{"x":20,"y":30},{"x":300,"y":500}],"width":6}]}"#;

fn config(root: &Path) -> CliConfig {
    CliConfig {
        data_dir: root.join("data"),
        settings_path: Some(root.join("settings.json")),
        render_context: RenderContext::new(Appearance::Light, 1.0),
        ..CliConfig::new()
    }
}

async fn exec(config: &CliConfig, command: Command) -> Result<String, CliError> {
    let mut out = Vec::new();
    run(config, &command, &mut out).await?;
    Ok(String::from_utf8(out).expect("utf8"))
}

#[tokio::test]
async fn test_add_copy_delete_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let ink = dir.path().join("page.json");
    std::fs::write(&ink, INK).expect("ink");

    let added = exec(&config, Command::Add { file: ink.clone(), autosave: false })
        .await
        .expect("add");
    assert_eq!(added.trim(), "added drawing 0");

    let copied = exec(&config, Command::Copy { index: 0 }).await.expect("copy");
    assert_eq!(copied.trim(), "copied drawing 0 to 1");

    let missing = exec(&config, Command::Delete { index: 7 }).await.expect("delete");
    assert_eq!(missing.trim(), "no drawing at index 7");

    let listing = exec(&config, Command::List { json: true }).await.expect("list");
    let value: serde_json::Value = serde_json::from_str(&listing).expect("json");
    assert_eq!(value["state"], "open");
    assert_eq!(value["drawings"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["drawings"][1]["strokes"], 1);

    exec(&config, Command::Delete { index: 0 }).await.expect("delete");
    let listing = exec(&config, Command::List { json: false }).await.expect("list");
    assert!(listing.starts_with("open (Autosave: On)"));
    assert_eq!(listing.lines().count(), 2);
}

#[tokio::test]
async fn test_autosave_off_skips_autosaved_edits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let ink = dir.path().join("page.json");
    std::fs::write(&ink, INK).expect("ink");

    let label = exec(&config, Command::Autosave { switch: Some(Switch::Off) })
        .await
        .expect("autosave");
    assert_eq!(label.trim(), "Autosave: Off");
    let label = exec(&config, Command::Autosave { switch: None }).await.expect("autosave");
    assert_eq!(label.trim(), "Autosave: Off");

    exec(&config, Command::Add { file: ink, autosave: true })
        .await
        .expect("add");
    assert!(!config.document_path().exists());
}

#[tokio::test]
async fn test_replace_rejects_missing_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let ink = dir.path().join("page.json");
    std::fs::write(&ink, INK).expect("ink");

    let err = exec(
        &config,
        Command::Replace {
            index: 0,
            file: ink,
            autosave: false,
        },
    )
    .await
    .expect_err("no drawings yet");
    assert!(matches!(err, CliError::Usage(_)));
}

#[tokio::test]
async fn test_thumbnails_and_share_write_pngs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let ink = dir.path().join("page.json");
    std::fs::write(&ink, INK).expect("ink");
    exec(&config, Command::Add { file: ink, autosave: false })
        .await
        .expect("add");

    let thumbs = dir.path().join("thumbs");
    let out = exec(&config, Command::Thumbnails { out_dir: thumbs.clone() })
        .await
        .expect("thumbnails");
    assert!(out.starts_with("wrote 1 thumbnails"));
    let png = std::fs::read(thumbs.join("thumbnail-000.png")).expect("png");
    assert_eq!(&png[1..4], b"PNG");

    let shared = dir.path().join("share.png");
    let out = exec(
        &config,
        Command::Share {
            index: 0,
            out: shared.clone(),
        },
    )
    .await
    .expect("share");
    assert!(out.contains("(286x476)"));
    assert!(shared.exists());
}

#[tokio::test]
async fn test_resolve_without_conflicts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let out = exec(&config, Command::Resolve).await.expect("resolve");
    assert_eq!(out.trim(), "no conflicts");
}
