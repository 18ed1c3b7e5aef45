use mynotes_core::models::{FolderId, NoteDraft, NoteId, NotePatch};
use mynotes_core::util::normalize_text_option;

use crate::commands::common::{format_note_lines, resolve_note_content, Service};
use crate::error::CliError;

pub async fn run_notes_list(
    service: &Service,
    folder: Option<i64>,
    as_json: bool,
) -> Result<(), CliError> {
    let notes = service.get_notes(folder.map(FolderId)).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if notes.is_empty() {
        println!("No notes.");
    } else {
        for line in format_note_lines(&notes) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_notes_add(
    service: &Service,
    title: Option<String>,
    folder: Option<i64>,
    content_parts: &[String],
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;
    let note = service.create_note(note_draft(title, folder, content)).await?;
    println!("Created note {} ({})", note.id, note.title);
    Ok(())
}

pub async fn run_notes_edit(
    service: &Service,
    id: i64,
    title: Option<String>,
    content: Option<String>,
    folder: Option<Option<i64>>,
) -> Result<(), CliError> {
    let patch = note_patch(title, content, folder)?;
    let note = service.update_note(NoteId(id), patch).await?;
    println!("Updated note {} ({})", note.id, note.title);
    Ok(())
}

pub async fn run_notes_delete(service: &Service, id: i64) -> Result<(), CliError> {
    let ack = service.delete_note(NoteId(id)).await?;
    println!("{}", ack.message);
    Ok(())
}

pub fn note_draft(title: Option<String>, folder: Option<i64>, content: String) -> NoteDraft {
    let mut draft = normalize_text_option(title).map_or_else(NoteDraft::default, NoteDraft::titled);
    draft = draft.with_content(content);
    if let Some(folder) = folder {
        draft = draft.in_folder(FolderId(folder));
    }
    draft
}

pub fn note_patch(
    title: Option<String>,
    content: Option<String>,
    folder: Option<Option<i64>>,
) -> Result<NotePatch, CliError> {
    let patch = NotePatch {
        title: normalize_text_option(title),
        content,
        folder_id: folder.map(|folder| folder.map(FolderId)),
    };
    if patch.is_empty() {
        return Err(CliError::NothingToUpdate("--title, --content, --folder, --unfile"));
    }
    Ok(patch)
}
