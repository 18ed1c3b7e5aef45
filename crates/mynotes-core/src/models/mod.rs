//! Data models for MyNotes

mod folder;
mod note;
mod sync_entry;
mod tree;

pub use folder::{default_folders, Folder, FolderDraft, FolderId, FolderPatch, DEFAULT_FOLDER_ICON};
pub use note::{Note, NoteDraft, NoteId, NotePatch, DEFAULT_NOTE_TITLE};
pub use sync_entry::{DeleteAck, EntityKind, EntryId, SyncOperation, SyncQueueEntry};
pub use tree::FolderTree;

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable patch field so that an explicit `null` becomes
/// `Some(None)`. Absent fields fall back to `None` through `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

