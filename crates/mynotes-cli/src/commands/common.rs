use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use mynotes_core::models::{Folder, Note, SyncQueueEntry};
use mynotes_core::util::normalize_text_option;
use mynotes_core::{ClientConfig, ConnectivityProbe, DataService, HttpRemote};

use crate::error::CliError;

pub type Service = DataService<HttpRemote>;

/// Settings given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub api_url: Option<String>,
    pub offline: bool,
}

pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ClientConfig, CliError> {
    resolve_config_with(overrides, |name| std::env::var(name).ok())
}

pub fn resolve_config_with(
    overrides: &ConfigOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, CliError> {
    let mut config = match &overrides.config_path {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => match mynotes_core::config::default_config_path() {
            Some(path) => ClientConfig::load_from_path(&path)?,
            None => ClientConfig::default(),
        },
    };
    config.apply_overrides(lookup)?;

    if let Some(url) = normalize_text_option(overrides.api_url.clone()) {
        config.api_base_url = url;
    }
    if let Some(dir) = &overrides.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if overrides.offline {
        config.start_offline = true;
    }
    config.normalize()?;
    Ok(config)
}

/// Open the data service and check once whether the notes service answers.
pub async fn open_service(config: &ClientConfig) -> Result<Service, CliError> {
    let service = DataService::from_config(config)?;
    if service.is_online() {
        ConnectivityProbe::probe_once(service.remote(), service.connectivity()).await;
    }
    tracing::debug!(
        "Opened data service against {} ({})",
        service.remote().base_url(),
        if service.is_online() { "online" } else { "offline" }
    );
    Ok(service)
}

/// Replay changes left over from earlier offline runs.
pub async fn flush_pending(service: &Service) -> Result<(), CliError> {
    if service.pending().is_empty() {
        return Ok(());
    }
    if let Some(report) = service.replay().await? {
        if report.synced > 0 {
            eprintln!("Synced {} queued change(s)", report.synced);
        }
    }
    Ok(())
}

pub fn format_folder_lines(folders: &[Folder]) -> Vec<String> {
    let mut lines = Vec::new();
    push_folder_lines(folders, 0, &mut lines);
    lines
}

fn push_folder_lines(folders: &[Folder], depth: usize, lines: &mut Vec<String>) {
    for folder in folders {
        let indent = "  ".repeat(depth);
        lines.push(format!(
            "{indent}{} {}  #{}",
            folder.icon, folder.name, folder.id
        ));
        push_folder_lines(&folder.subfolders, depth + 1, lines);
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now = Utc::now();
    notes
        .iter()
        .map(|note| {
            let id = note.id.to_string();
            let title = truncate(&note.title, 30);
            let folder = note
                .folder_id
                .map_or_else(|| "-".to_string(), |folder| format!("#{folder}"));
            let relative_time = format_relative_time(note.last_modified(), now);
            let preview = note_preview(&note.content, 40);

            if preview.is_empty() {
                format!("{id:<14}  {title:<30}  {folder:<8}  {relative_time}")
            } else {
                format!("{id:<14}  {title:<30}  {folder:<8}  {relative_time:<10}  {preview}")
            }
        })
        .collect()
}

pub fn format_entry_lines(entries: &[SyncQueueEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let target = entry
                .entity_id()
                .map_or_else(|| "?".to_string(), |id| id.to_string());
            format!(
                "{}  {:<6}  {:<6}  id={}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                entry.operation,
                entry.entity_type,
                target
            )
        })
        .collect()
}

/// First line of the note's text with markup removed.
pub fn note_preview(content: &str, max_chars: usize) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    let first_line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, max_chars)
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = value.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Note content from arguments, or from piped stdin when no arguments are
/// given. Empty content is allowed.
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    let joined = content_parts.join(" ");
    if let Some(content) = normalize_text_option(Some(joined)) {
        return Ok(content);
    }
    Ok(read_piped_stdin()?.unwrap_or_default())
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_text_option(Some(buffer)))
}
