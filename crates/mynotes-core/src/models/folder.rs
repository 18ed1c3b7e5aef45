//! Folder model

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Icon used when a folder is created without one.
pub const DEFAULT_FOLDER_ICON: &str = "📁";

/// Folder identifier. Server-assigned, or provisional when created offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub i64);

impl FolderId {
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FolderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A folder as exchanged with the remote service and persisted locally.
///
/// Subfolders are owned and ordered. In memory the collection is handled as a
/// [`FolderTree`](super::FolderTree) arena instead of this nested shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subfolders: Vec<Folder>,
}

impl Folder {
    /// Build a folder record from a draft, stamping both timestamps with `now`.
    #[must_use]
    pub fn from_draft(id: FolderId, draft: &FolderDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            icon: draft.icon.clone(),
            parent_id: draft.parent_id,
            created_at: Some(now),
            updated_at: Some(now),
            subfolders: Vec::new(),
        }
    }

    /// Apply the set fields of a patch and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: &FolderPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(icon) = &patch.icon {
            self.icon.clone_from(icon);
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        self.updated_at = Some(now);
    }

    /// Total number of folders in this subtree, including `self`.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.subfolders.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// Request body for creating a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDraft {
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

impl FolderDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: DEFAULT_FOLDER_ICON.to_string(),
            parent_id: None,
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub const fn with_parent(mut self, parent_id: FolderId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial folder update. Unset fields are left untouched and not sent.
///
/// `parent_id` is `Some(None)` to move the folder to the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<FolderId>>,
}

impl FolderPatch {
    #[must_use]
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn move_to(parent_id: Option<FolderId>) -> Self {
        Self {
            name: None,
            icon: None,
            parent_id: Some(parent_id),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.icon.is_none() && self.parent_id.is_none()
    }
}

fn default_icon() -> String {
    DEFAULT_FOLDER_ICON.to_string()
}

fn seed_folder(id: i64, name: &str, icon: &str, parent_id: Option<i64>) -> Folder {
    Folder {
        id: FolderId(id),
        name: name.to_string(),
        icon: icon.to_string(),
        parent_id: parent_id.map(FolderId),
        created_at: None,
        updated_at: None,
        subfolders: Vec::new(),
    }
}

/// Built-in folder set returned before anything has ever been persisted.
#[must_use]
pub fn default_folders() -> Vec<Folder> {
    let mut personal = seed_folder(1, "Persönlich", "👤", None);
    personal.subfolders = vec![
        seed_folder(11, "Tagebuch", "📖", Some(1)),
        seed_folder(12, "Ideen", "💡", Some(1)),
    ];

    let mut work = seed_folder(2, "Arbeit", "💼", None);
    work.subfolders = vec![
        seed_folder(21, "Meetings", "🤝", Some(2)),
        seed_folder(22, "Projekte", "📊", Some(2)),
    ];

    vec![personal, work]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_folders_have_two_roots_with_named_subfolders() {
        let folders = default_folders();
        let names = folders
            .iter()
            .map(|folder| {
                (
                    folder.name.as_str(),
                    folder
                        .subfolders
                        .iter()
                        .map(|sub| sub.name.as_str())
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                ("Persönlich", vec!["Tagebuch", "Ideen"]),
                ("Arbeit", vec!["Meetings", "Projekte"]),
            ]
        );
    }

    #[test]
    fn folder_deserializes_backend_payload_without_optional_fields() {
        let folder: Folder = serde_json::from_str(r#"{"id": 7, "name": "Inbox"}"#).unwrap();
        assert_eq!(folder.id, FolderId(7));
        assert_eq!(folder.icon, DEFAULT_FOLDER_ICON);
        assert!(folder.subfolders.is_empty());
        assert!(folder.parent_id.is_none());
    }

    #[test]
    fn folder_patch_omits_unset_fields() {
        let json = serde_json::to_value(FolderPatch::rename("Renamed")).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Renamed" }));
    }

    #[test]
    fn apply_patch_only_touches_set_fields() {
        let now = chrono::Utc::now();
        let mut folder = Folder::from_draft(FolderId(3), &FolderDraft::new("Old"), now);
        folder.apply_patch(
            &FolderPatch {
                icon: Some("🗂".to_string()),
                ..FolderPatch::default()
            },
            now,
        );
        assert_eq!(folder.name, "Old");
        assert_eq!(folder.icon, "🗂");
    }

    #[test]
    fn null_parent_in_patch_is_distinct_from_absent() {
        let absent: FolderPatch = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(absent.parent_id, None);
        let cleared: FolderPatch = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(cleared.parent_id, Some(None));
        assert_eq!(
            serde_json::to_value(&cleared).unwrap(),
            serde_json::json!({ "parent_id": null })
        );

        let now = chrono::Utc::now();
        let mut folder = Folder::from_draft(
            FolderId(11),
            &FolderDraft::new("Tagebuch").with_parent(FolderId(1)),
            now,
        );
        folder.apply_patch(&absent, now);
        assert_eq!(folder.parent_id, Some(FolderId(1)));
        folder.apply_patch(&cleared, now);
        assert_eq!(folder.parent_id, None);
    }

    #[test]
    fn folder_id_parses_from_text() {
        assert_eq!(" 42 ".parse::<FolderId>().unwrap(), FolderId(42));
        assert!("abc".parse::<FolderId>().is_err());
    }
}
