use std::path::PathBuf;

use chrono::{Duration, Utc};
use mynotes_core::models::{default_folders, FolderId, SyncOperation, DEFAULT_NOTE_TITLE};
use pretty_assertions::assert_eq;

use crate::commands::common::{
    format_entry_lines, format_folder_lines, format_relative_time, note_preview, open_service,
    resolve_config_with, ConfigOverrides,
};
use crate::commands::folders::{folder_draft, folder_patch, run_folders_create};
use crate::commands::notes::{note_draft, note_patch, run_notes_add, run_notes_delete};
use crate::commands::sync::{run_sync, status_report};
use crate::error::CliError;

fn no_env(_: &str) -> Option<String> {
    None
}

fn offline_overrides(data_dir: PathBuf) -> ConfigOverrides {
    ConfigOverrides {
        config_path: Some(data_dir.join("missing-config.json")),
        data_dir: Some(data_dir),
        api_url: None,
        offline: true,
    }
}

#[test]
fn folder_draft_trims_and_rejects_empty_name() {
    let draft = folder_draft("  Rezepte ", Some(" 🍲 ".to_string()), Some(1)).unwrap();
    assert_eq!(draft.name, "Rezepte");
    assert_eq!(draft.icon, "🍲");
    assert_eq!(draft.parent_id, Some(FolderId(1)));

    assert!(matches!(
        folder_draft("   ", None, None),
        Err(CliError::EmptyFolderName)
    ));
}

#[test]
fn folder_draft_defaults_icon() {
    let draft = folder_draft("Inbox", Some("  ".to_string()), None).unwrap();
    assert_eq!(draft.icon, "📁");
}

#[test]
fn empty_patches_are_rejected() {
    assert!(matches!(
        folder_patch(None, Some(" ".to_string()), None),
        Err(CliError::NothingToUpdate(_))
    ));
    assert!(matches!(
        note_patch(None, None, None),
        Err(CliError::NothingToUpdate(_))
    ));
    let patch = note_patch(None, Some(String::new()), None).unwrap();
    assert_eq!(patch.content.as_deref(), Some(""));
}

#[test]
fn clearing_flags_build_null_references() {
    let patch = folder_patch(None, None, Some(None)).unwrap();
    assert_eq!(patch.parent_id, Some(None));
    let patch = note_patch(None, None, Some(None)).unwrap();
    assert_eq!(patch.folder_id, Some(None));
    let patch = note_patch(None, None, Some(Some(12))).unwrap();
    assert_eq!(patch.folder_id, Some(Some(FolderId(12))));
}

#[test]
fn note_draft_falls_back_to_default_title() {
    let draft = note_draft(Some("  ".to_string()), Some(11), "text".to_string());
    assert_eq!(draft.title, DEFAULT_NOTE_TITLE);
    assert_eq!(draft.folder_id, Some(FolderId(11)));
    assert_eq!(draft.content, "text");
}

#[test]
fn note_preview_strips_markup() {
    assert_eq!(
        note_preview("<p><b>Hallo</b> Welt</p><p>zweite Zeile</p>", 40),
        "Hallo Welt zweite Zeile"
    );
    assert_eq!(note_preview("<br>\n\nerste\nzweite", 40), "erste");
    assert_eq!(note_preview("abcdefghij", 6), "abc...");
}

#[test]
fn format_relative_time_buckets() {
    let now = Utc::now();
    assert_eq!(format_relative_time(now, now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m ago");
    assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h ago");
    assert_eq!(format_relative_time(now - Duration::days(2), now), "2d ago");
    assert_eq!(format_relative_time(now + Duration::minutes(5), now), "just now");
}

#[test]
fn format_folder_lines_indents_subfolders() {
    let lines = format_folder_lines(&default_folders());
    assert_eq!(
        lines,
        vec![
            "👤 Persönlich  #1",
            "  📖 Tagebuch  #11",
            "  💡 Ideen  #12",
            "💼 Arbeit  #2",
            "  🤝 Meetings  #21",
            "  📊 Projekte  #22",
        ]
    );
}

#[test]
fn resolve_config_applies_file_env_then_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"api_base_url": "http://file.example.com/api", "request_timeout_secs": 30}"#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        config_path: Some(path.clone()),
        ..ConfigOverrides::default()
    };
    let env = |name: &str| (name == "MYNOTES_TIMEOUT_SECS").then(|| "5".to_string());
    let config = resolve_config_with(&overrides, env).unwrap();
    assert_eq!(config.api_base_url, "http://file.example.com/api");
    assert_eq!(config.request_timeout_secs, 5);

    let overrides = ConfigOverrides {
        config_path: Some(path),
        api_url: Some("http://flag.example.com/api/".to_string()),
        offline: true,
        ..ConfigOverrides::default()
    };
    let config = resolve_config_with(&overrides, no_env).unwrap();
    assert_eq!(config.api_base_url, "http://flag.example.com/api");
    assert!(config.start_offline);
}

#[test]
fn resolve_config_rejects_invalid_flag_url() {
    let dir = tempfile::tempdir().unwrap();
    let overrides = ConfigOverrides {
        api_url: Some("notes.example.com".to_string()),
        ..offline_overrides(dir.path().to_path_buf())
    };
    assert!(resolve_config_with(&overrides, no_env).is_err());
}

#[tokio::test]
async fn offline_commands_queue_changes_in_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = resolve_config_with(&offline_overrides(dir.path().to_path_buf()), no_env).unwrap();
    let service = open_service(&config).await.unwrap();
    assert!(!service.is_online());

    run_folders_create(&service, "Reisen", None, None).await.unwrap();
    run_notes_add(&service, Some("Packliste".to_string()), None, &["Pass".to_string()])
        .await
        .unwrap();
    let note_id = service.get_notes(None).await.unwrap()[0].id;
    run_notes_delete(&service, note_id.get()).await.unwrap();
    run_sync(&service).await.unwrap();

    let pending = service.pending();
    assert_eq!(pending.len(), 3);
    assert_eq!(pending[2].operation, SyncOperation::Delete);
    assert_eq!(status_report(&service).pending, 3);
    assert_eq!(format_entry_lines(&pending).len(), 3);

    let reopened = open_service(&config).await.unwrap();
    assert_eq!(reopened.pending().len(), 3);
    assert!(reopened.get_notes(None).await.unwrap().is_empty());
}
