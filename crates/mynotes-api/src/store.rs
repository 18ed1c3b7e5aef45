//! In-memory folders and notes tables.

use chrono::Utc;
use mynotes_core::models::{
    default_folders, Folder, FolderDraft, FolderId, FolderPatch, FolderTree, Note, NoteDraft,
    NoteId, NotePatch,
};

use crate::error::AppError;

const FOLDER_NOT_FOUND: &str = "Folder not found";
const NOTE_NOT_FOUND: &str = "Note not found";

/// Server-side state. Ids are assigned sequentially per table.
#[derive(Debug)]
pub struct NotesStore {
    folders: FolderTree,
    notes: Vec<Note>,
    next_folder_id: i64,
    next_note_id: i64,
}

impl Default for NotesStore {
    fn default() -> Self {
        Self {
            folders: FolderTree::default(),
            notes: Vec::new(),
            next_folder_id: 1,
            next_note_id: 1,
        }
    }
}

impl NotesStore {
    /// Store pre-filled with the built-in default folders.
    pub fn with_default_folders() -> Self {
        let now = Utc::now();
        let mut folders = default_folders();
        stamp(&mut folders, now);
        let tree = FolderTree::from_nested(folders);
        let next_folder_id = tree.ids().iter().map(|id| id.get()).max().unwrap_or(0) + 1;
        Self {
            folders: tree,
            next_folder_id,
            ..Self::default()
        }
    }

    /// Top-level folders with nested subfolders.
    pub fn list_folders(&self) -> Vec<Folder> {
        self.folders.to_nested()
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Folder, AppError> {
        self.folders
            .subtree(id)
            .ok_or(AppError::NotFound(FOLDER_NOT_FOUND))
    }

    pub fn create_folder(&mut self, draft: &FolderDraft) -> Result<Folder, AppError> {
        if draft.name.trim().is_empty() {
            return Err(AppError::bad_request("Folder name must not be empty"));
        }
        let id = FolderId(self.next_folder_id);
        self.next_folder_id += 1;
        let folder = Folder::from_draft(id, draft, Utc::now());
        self.folders.insert(folder.clone())?;
        tracing::debug!("Created folder {} ({})", id, folder.name);
        Ok(folder)
    }

    pub fn update_folder(&mut self, id: FolderId, patch: &FolderPatch) -> Result<Folder, AppError> {
        if !self.folders.contains(id) {
            return Err(AppError::NotFound(FOLDER_NOT_FOUND));
        }
        self.folders.patch(id, patch, Utc::now())?;
        self.get_folder(id)
    }

    /// Delete a folder with all of its subfolders.
    pub fn delete_folder(&mut self, id: FolderId) -> Result<usize, AppError> {
        let removed = self.folders.remove(id);
        if removed.is_empty() {
            return Err(AppError::NotFound(FOLDER_NOT_FOUND));
        }
        tracing::debug!("Deleted folder {} and {} subfolder(s)", id, removed.len() - 1);
        Ok(removed.len())
    }

    /// Non-deleted notes in insertion order.
    pub fn list_notes(&self, folder_id: Option<FolderId>) -> Vec<Note> {
        self.notes
            .iter()
            .filter(|note| !note.is_deleted)
            .filter(|note| folder_id.is_none() || note.folder_id == folder_id)
            .cloned()
            .collect()
    }

    pub fn get_note(&self, id: NoteId) -> Result<Note, AppError> {
        self.notes
            .iter()
            .find(|note| note.id == id && !note.is_deleted)
            .cloned()
            .ok_or(AppError::NotFound(NOTE_NOT_FOUND))
    }

    pub fn create_note(&mut self, draft: &NoteDraft) -> Note {
        let id = NoteId(self.next_note_id);
        self.next_note_id += 1;
        let note = Note::from_draft(id, draft, Utc::now());
        self.notes.push(note.clone());
        note
    }

    pub fn update_note(&mut self, id: NoteId, patch: &NotePatch) -> Result<Note, AppError> {
        let note = self.live_note_mut(id)?;
        note.apply_patch(patch, Utc::now());
        Ok(note.clone())
    }

    /// Soft delete: the note stays stored with `is_deleted` set.
    pub fn delete_note(&mut self, id: NoteId) -> Result<(), AppError> {
        self.live_note_mut(id)?.mark_deleted(Utc::now());
        Ok(())
    }

    /// Bulk upsert keyed by `(title, folder_id)` among live notes.
    pub fn sync_notes(&mut self, drafts: &[NoteDraft]) -> Vec<Note> {
        drafts
            .iter()
            .map(|draft| {
                let existing = self.notes.iter().position(|note| {
                    !note.is_deleted
                        && note.title == draft.title
                        && note.folder_id == draft.folder_id
                });
                match existing {
                    Some(index) => {
                        let note = &mut self.notes[index];
                        note.content.clone_from(&draft.content);
                        note.updated_at = Some(Utc::now());
                        note.clone()
                    }
                    None => self.create_note(draft),
                }
            })
            .collect()
    }

    fn live_note_mut(&mut self, id: NoteId) -> Result<&mut Note, AppError> {
        self.notes
            .iter_mut()
            .find(|note| note.id == id && !note.is_deleted)
            .ok_or(AppError::NotFound(NOTE_NOT_FOUND))
    }
}

fn stamp(folders: &mut [Folder], now: chrono::DateTime<Utc>) {
    for folder in folders {
        folder.created_at = Some(now);
        stamp(&mut folder.subfolders, now);
    }
}
