//! Note model

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FolderId;

/// Title given to notes created without one.
pub const DEFAULT_NOTE_TITLE: &str = "Unbenannt";

/// Note identifier. Server-assigned, or provisional when created offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl NoteId {
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    /// Note title
    #[serde(default = "default_title")]
    pub title: String,
    /// Rich-text markup
    #[serde(default)]
    pub content: String,
    /// Containing folder (reference, not ownership)
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft delete flag for sync
    #[serde(default)]
    pub is_deleted: bool,
}

impl Note {
    /// Build a note record from a draft, stamping both timestamps with `now`.
    #[must_use]
    pub fn from_draft(id: NoteId, draft: &NoteDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            folder_id: draft.folder_id,
            created_at: now,
            updated_at: Some(now),
            is_deleted: false,
        }
    }

    /// Apply the set fields of a patch and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: &NotePatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(folder_id) = patch.folder_id {
            self.folder_id = folder_id;
        }
        self.updated_at = Some(now);
    }

    /// Turn the note into a tombstone. The record itself is kept.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.updated_at = Some(now);
    }

    /// Most recent modification time.
    #[must_use]
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Request body for creating a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

impl Default for NoteDraft {
    fn default() -> Self {
        Self {
            title: default_title(),
            content: String::new(),
            folder_id: None,
        }
    }
}

impl NoteDraft {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub const fn in_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = Some(folder_id);
        self
    }
}

/// Partial note update. Unset fields are left untouched and not sent.
///
/// `folder_id` is `Some(None)` to take the note out of its folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_id: Option<Option<FolderId>>,
}

impl NotePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.folder_id.is_none()
    }
}

fn default_title() -> String {
    DEFAULT_NOTE_TITLE.to_string()
}
