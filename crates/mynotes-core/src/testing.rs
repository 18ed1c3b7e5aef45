//! In-memory remote service double for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::models::{
    DeleteAck, Folder, FolderDraft, FolderId, FolderPatch, FolderTree, Note, NoteDraft, NoteId,
    NotePatch,
};
use crate::remote::{RemoteError, RemoteResult, RemoteService};

#[derive(Debug, Default)]
struct FakeState {
    folders: FolderTree,
    notes: Vec<Note>,
    next_id: i64,
    failing: bool,
    failing_titles: HashSet<String>,
    failing_folders: HashSet<String>,
    calls: Vec<String>,
}

/// Remote double with sequential ids and switchable failures.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.state().next_id = 1;
        remote
    }

    /// Make every request fail like an unreachable server.
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    /// Reject note creates and updates carrying this title.
    pub fn fail_note_titled(&self, title: &str) {
        self.state().failing_titles.insert(title.to_string());
    }

    /// Reject folder creates carrying this name.
    pub fn fail_folder_named(&self, name: &str) {
        self.state().failing_folders.insert(name.to_string());
    }

    pub fn seed_note(&self, note: Note) {
        let mut state = self.state();
        state.next_id = state.next_id.max(note.id.get() + 1);
        state.notes.push(note);
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.state().folders.to_nested()
    }

    /// Every stored note, tombstones included.
    pub fn notes(&self) -> Vec<Note> {
        self.state().notes.clone()
    }

    /// Names of the operations received so far.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn begin(&self, call: &str) -> RemoteResult<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        if state.failing {
            return Err(RemoteError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(state)
    }
}

fn rejected(what: &str) -> RemoteError {
    RemoteError::Status {
        status: 422,
        message: format!("{what} rejected"),
    }
}

impl RemoteService for FakeRemote {
    async fn health(&self) -> RemoteResult<()> {
        self.begin("health").map(drop)
    }

    async fn list_folders(&self) -> RemoteResult<Vec<Folder>> {
        Ok(self.begin("list_folders")?.folders.to_nested())
    }

    async fn create_folder(&self, draft: &FolderDraft) -> RemoteResult<Folder> {
        let mut state = self.begin("create_folder")?;
        if state.failing_folders.contains(&draft.name) {
            return Err(rejected("folder"));
        }
        let id = FolderId(state.next_id);
        state.next_id += 1;
        let folder = Folder::from_draft(id, draft, Utc::now());
        state
            .folders
            .insert(folder.clone())
            .map_err(|error| RemoteError::Decode(error.to_string()))?;
        Ok(folder)
    }

    async fn update_folder(&self, id: FolderId, patch: &FolderPatch) -> RemoteResult<Folder> {
        let mut state = self.begin("update_folder")?;
        state
            .folders
            .patch(id, patch, Utc::now())
            .map_err(|_| RemoteError::NotFound("Folder not found".to_string()))
    }

    async fn delete_folder(&self, id: FolderId) -> RemoteResult<DeleteAck> {
        let mut state = self.begin("delete_folder")?;
        if state.folders.remove(id).is_empty() {
            return Err(RemoteError::NotFound("Folder not found".to_string()));
        }
        Ok(DeleteAck::folder_deleted())
    }

    async fn list_notes(&self, folder_id: Option<FolderId>) -> RemoteResult<Vec<Note>> {
        let state = self.begin("list_notes")?;
        Ok(state
            .notes
            .iter()
            .filter(|note| !note.is_deleted)
            .filter(|note| folder_id.is_none() || note.folder_id == folder_id)
            .cloned()
            .collect())
    }

    async fn create_note(&self, draft: &NoteDraft) -> RemoteResult<Note> {
        let mut state = self.begin("create_note")?;
        if state.failing_titles.contains(&draft.title) {
            return Err(rejected("note"));
        }
        let id = NoteId(state.next_id);
        state.next_id += 1;
        let note = Note::from_draft(id, draft, Utc::now());
        state.notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: NoteId, patch: &NotePatch) -> RemoteResult<Note> {
        let mut state = self.begin("update_note")?;
        if patch
            .title
            .as_ref()
            .is_some_and(|title| state.failing_titles.contains(title))
        {
            return Err(rejected("note"));
        }
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.id == id && !note.is_deleted)
            .ok_or_else(|| RemoteError::NotFound("Note not found".to_string()))?;
        note.apply_patch(patch, Utc::now());
        Ok(note.clone())
    }

    async fn delete_note(&self, id: NoteId) -> RemoteResult<DeleteAck> {
        let mut state = self.begin("delete_note")?;
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.id == id && !note.is_deleted)
            .ok_or_else(|| RemoteError::NotFound("Note not found".to_string()))?;
        note.mark_deleted(Utc::now());
        Ok(DeleteAck::note_deleted())
    }
}
