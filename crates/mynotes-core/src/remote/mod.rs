//! Remote notes service contract.
//!
//! [`RemoteService`] is the seam between the data service and the network.
//! [`HttpRemote`] talks JSON over HTTP; tests substitute in-memory doubles.

mod http;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

pub use http::HttpRemote;

use crate::models::{
    DeleteAck, Folder, FolderDraft, FolderId, FolderPatch, Note, NoteDraft, NoteId, NotePatch,
};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Remote record not found: {0}")]
    NotFound(String),
    #[error("Invalid remote payload: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether the failure means the target record does not exist remotely.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// REST endpoints for folders and notes.
pub trait RemoteService: Send + Sync {
    /// Cheap reachability check.
    fn health(&self) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Top-level folders with their nested subfolders.
    fn list_folders(&self) -> impl Future<Output = RemoteResult<Vec<Folder>>> + Send;

    fn create_folder(
        &self,
        draft: &FolderDraft,
    ) -> impl Future<Output = RemoteResult<Folder>> + Send;

    fn update_folder(
        &self,
        id: FolderId,
        patch: &FolderPatch,
    ) -> impl Future<Output = RemoteResult<Folder>> + Send;

    /// Delete a folder and its subtree.
    fn delete_folder(&self, id: FolderId) -> impl Future<Output = RemoteResult<DeleteAck>> + Send;

    /// Non-deleted notes, optionally only those of one folder.
    fn list_notes(
        &self,
        folder_id: Option<FolderId>,
    ) -> impl Future<Output = RemoteResult<Vec<Note>>> + Send;

    fn create_note(&self, draft: &NoteDraft) -> impl Future<Output = RemoteResult<Note>> + Send;

    fn update_note(
        &self,
        id: NoteId,
        patch: &NotePatch,
    ) -> impl Future<Output = RemoteResult<Note>> + Send;

    /// Soft-delete a note.
    fn delete_note(&self, id: NoteId) -> impl Future<Output = RemoteResult<DeleteAck>> + Send;
}

impl<R: RemoteService> RemoteService for Arc<R> {
    fn health(&self) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).health()
    }

    fn list_folders(&self) -> impl Future<Output = RemoteResult<Vec<Folder>>> + Send {
        (**self).list_folders()
    }

    fn create_folder(
        &self,
        draft: &FolderDraft,
    ) -> impl Future<Output = RemoteResult<Folder>> + Send {
        (**self).create_folder(draft)
    }

    fn update_folder(
        &self,
        id: FolderId,
        patch: &FolderPatch,
    ) -> impl Future<Output = RemoteResult<Folder>> + Send {
        (**self).update_folder(id, patch)
    }

    fn delete_folder(&self, id: FolderId) -> impl Future<Output = RemoteResult<DeleteAck>> + Send {
        (**self).delete_folder(id)
    }

    fn list_notes(
        &self,
        folder_id: Option<FolderId>,
    ) -> impl Future<Output = RemoteResult<Vec<Note>>> + Send {
        (**self).list_notes(folder_id)
    }

    fn create_note(&self, draft: &NoteDraft) -> impl Future<Output = RemoteResult<Note>> + Send {
        (**self).create_note(draft)
    }

    fn update_note(
        &self,
        id: NoteId,
        patch: &NotePatch,
    ) -> impl Future<Output = RemoteResult<Note>> + Send {
        (**self).update_note(id, patch)
    }

    fn delete_note(&self, id: NoteId) -> impl Future<Output = RemoteResult<DeleteAck>> + Send {
        (**self).delete_note(id)
    }
}
