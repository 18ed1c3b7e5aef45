//! Pending mutation records kept in the sync queue.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of a queue entry, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which remote collection an entry targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Folder,
    Note,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutation kind of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation that has been applied locally but not yet acknowledged remotely.
///
/// `payload` is the JSON form of the affected record (or `{"id": ..}` for a
/// folder delete); it is decoded into the matching request type on replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    #[serde(default)]
    pub id: EntryId,
    pub entity_type: EntityKind,
    pub operation: SyncOperation,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl SyncQueueEntry {
    #[must_use]
    pub fn new(entity_type: EntityKind, operation: SyncOperation, payload: Value) -> Self {
        Self {
            id: EntryId::new(),
            entity_type,
            operation,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Id of the record this entry targets, when the payload carries one.
    pub fn entity_id(&self) -> Option<i64> {
        self.payload.get("id").and_then(Value::as_i64)
    }

    /// Whether both entries target the same record.
    pub fn same_entity(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.entity_id().is_some()
            && self.entity_id() == other.entity_id()
    }
}

/// Acknowledgement returned by delete operations, mirroring `{"message": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub message: String,
}

impl DeleteAck {
    pub fn folder_deleted() -> Self {
        Self {
            message: "Folder deleted successfully".to_string(),
        }
    }

    pub fn note_deleted() -> Self {
        Self {
            message: "Note deleted successfully".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entry_serializes_lowercase_tags() {
        let entry = SyncQueueEntry::new(EntityKind::Note, SyncOperation::Create, json!({"id": 5}));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["entity_type"], "note");
        assert_eq!(value["operation"], "create");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn entry_ids_are_unique() {
        assert_ne!(EntryId::new(), EntryId::new());
    }

    #[test]
    fn same_entity_requires_matching_kind_and_id() {
        let a = SyncQueueEntry::new(EntityKind::Note, SyncOperation::Update, json!({"id": 1}));
        let b = SyncQueueEntry::new(EntityKind::Note, SyncOperation::Update, json!({"id": 1}));
        let c = SyncQueueEntry::new(EntityKind::Folder, SyncOperation::Update, json!({"id": 1}));
        let d = SyncQueueEntry::new(EntityKind::Note, SyncOperation::Update, json!({}));
        assert!(a.same_entity(&b));
        assert!(!a.same_entity(&c));
        assert!(!d.same_entity(&d.clone()));
    }

    #[test]
    fn entry_without_id_field_still_loads() {
        let entry: SyncQueueEntry = serde_json::from_str(
            r#"{"entity_type":"folder","operation":"delete","payload":{"id":3},
                "timestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(entry.entity_id(), Some(3));
    }
}
