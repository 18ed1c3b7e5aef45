//! Provisional-to-canonical id rewriting for queued payloads.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{EntityKind, SyncQueueEntry};

/// Ids reassigned by the server during a replay, per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdRemap {
    folders: HashMap<i64, i64>,
    notes: HashMap<i64, i64>,
}

impl IdRemap {
    pub fn insert(&mut self, kind: EntityKind, provisional: i64, canonical: i64) {
        if provisional == canonical {
            return;
        }
        match kind {
            EntityKind::Folder => self.folders.insert(provisional, canonical),
            EntityKind::Note => self.notes.insert(provisional, canonical),
        };
    }

    pub fn get(&self, kind: EntityKind, id: i64) -> Option<i64> {
        match kind {
            EntityKind::Folder => self.folders.get(&id).copied(),
            EntityKind::Note => self.notes.get(&id).copied(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.notes.is_empty()
    }

    pub fn folders(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.folders.iter().map(|(old, new)| (*old, *new))
    }

    pub fn notes(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.notes.iter().map(|(old, new)| (*old, *new))
    }

    /// Rewrite the ids an entry's payload refers to.
    ///
    /// Returns `true` when anything changed.
    pub fn apply(&self, entry: &mut SyncQueueEntry) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut changed = self.rewrite_field(&mut entry.payload, "id", entry.entity_type);
        let reference_field = match entry.entity_type {
            EntityKind::Folder => "parent_id",
            EntityKind::Note => "folder_id",
        };
        changed |= self.rewrite_field(&mut entry.payload, reference_field, EntityKind::Folder);
        changed
    }

    fn rewrite_field(&self, payload: &mut Value, field: &str, kind: EntityKind) -> bool {
        let Some(slot) = payload.get_mut(field) else {
            return false;
        };
        let Some(canonical) = slot.as_i64().and_then(|id| self.get(kind, id)) else {
            return false;
        };
        *slot = Value::from(canonical);
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::SyncOperation;

    #[test]
    fn apply_rewrites_own_id_and_folder_reference() {
        let mut remap = IdRemap::default();
        remap.insert(EntityKind::Note, 1_700_000_000_000, 4);
        remap.insert(EntityKind::Folder, 1_700_000_000_001, 9);

        let mut entry = SyncQueueEntry::new(
            EntityKind::Note,
            SyncOperation::Update,
            json!({"id": 1_700_000_000_000_i64, "folder_id": 1_700_000_000_001_i64, "title": "x"}),
        );
        assert!(remap.apply(&mut entry));
        assert_eq!(entry.payload, json!({"id": 4, "folder_id": 9, "title": "x"}));
    }

    #[test]
    fn note_ids_do_not_leak_into_folder_entries() {
        let mut remap = IdRemap::default();
        remap.insert(EntityKind::Note, 5, 50);

        let mut entry =
            SyncQueueEntry::new(EntityKind::Folder, SyncOperation::Delete, json!({"id": 5}));
        assert!(!remap.apply(&mut entry));
        assert_eq!(entry.payload, json!({"id": 5}));
    }

    #[test]
    fn folder_parent_follows_remap() {
        let mut remap = IdRemap::default();
        remap.insert(EntityKind::Folder, 77, 3);

        let mut entry = SyncQueueEntry::new(
            EntityKind::Folder,
            SyncOperation::Create,
            json!({"id": 78, "name": "child", "parent_id": 77}),
        );
        assert!(remap.apply(&mut entry));
        assert_eq!(entry.payload["parent_id"], 3);
        assert_eq!(entry.payload["id"], 78);
    }

    #[test]
    fn null_references_are_left_alone() {
        let mut remap = IdRemap::default();
        remap.insert(EntityKind::Folder, 1, 2);
        let mut entry = SyncQueueEntry::new(
            EntityKind::Note,
            SyncOperation::Create,
            json!({"id": 10, "folder_id": null}),
        );
        assert!(!remap.apply(&mut entry));
    }
}
