use mynotes_core::models::{FolderDraft, FolderId, FolderPatch};
use mynotes_core::util::normalize_text_option;

use crate::commands::common::{format_folder_lines, Service};
use crate::error::CliError;

pub async fn run_folders_list(service: &Service, as_json: bool) -> Result<(), CliError> {
    let folders = service.get_folders().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else if folders.is_empty() {
        println!("No folders.");
    } else {
        for line in format_folder_lines(&folders) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_folders_create(
    service: &Service,
    name: &str,
    icon: Option<String>,
    parent: Option<i64>,
) -> Result<(), CliError> {
    let draft = folder_draft(name, icon, parent)?;
    let folder = service.create_folder(draft).await?;
    println!("Created folder {} {} (#{})", folder.icon, folder.name, folder.id);
    Ok(())
}

pub async fn run_folders_update(
    service: &Service,
    id: i64,
    name: Option<String>,
    icon: Option<String>,
    parent: Option<Option<i64>>,
) -> Result<(), CliError> {
    let patch = folder_patch(name, icon, parent)?;
    let folder = service.update_folder(FolderId(id), patch).await?;
    println!("Updated folder {} {} (#{})", folder.icon, folder.name, folder.id);
    Ok(())
}

pub async fn run_folders_delete(service: &Service, id: i64) -> Result<(), CliError> {
    let ack = service.delete_folder(FolderId(id)).await?;
    println!("{}", ack.message);
    Ok(())
}

pub fn folder_draft(
    name: &str,
    icon: Option<String>,
    parent: Option<i64>,
) -> Result<FolderDraft, CliError> {
    let name = normalize_text_option(Some(name.to_string())).ok_or(CliError::EmptyFolderName)?;
    let mut draft = FolderDraft::new(name);
    if let Some(icon) = normalize_text_option(icon) {
        draft = draft.with_icon(icon);
    }
    if let Some(parent) = parent {
        draft = draft.with_parent(FolderId(parent));
    }
    Ok(draft)
}

/// `parent` is `Some(None)` to move the folder to the top level.
pub fn folder_patch(
    name: Option<String>,
    icon: Option<String>,
    parent: Option<Option<i64>>,
) -> Result<FolderPatch, CliError> {
    let patch = FolderPatch {
        name: normalize_text_option(name),
        icon: normalize_text_option(icon),
        parent_id: parent.map(|parent| parent.map(FolderId)),
    };
    if patch.is_empty() {
        return Err(CliError::NothingToUpdate("--name, --icon, --parent, --root"));
    }
    Ok(patch)
}
