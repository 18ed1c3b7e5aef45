//! Pending-mutation queue and its replay against the remote service.
//!
//! Entries are appended in the order mutations were applied locally and
//! replayed in that same global order. An entry is removed only after the
//! remote service confirmed it; failed entries stay queued for the next
//! replay. Within one replay, once an entry for a record fails, later entries
//! for that record are held back so an update never overtakes its create.

mod remap;

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use remap::IdRemap;

use crate::error::Result;
use crate::models::{
    EntityKind, EntryId, FolderDraft, FolderId, FolderPatch, Note, NoteDraft, NoteId, NotePatch,
    SyncOperation, SyncQueueEntry,
};
use crate::remote::{RemoteError, RemoteResult, RemoteService};
use crate::store::{Collection, LocalStore};

/// Outcome of one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries sent to the remote service.
    pub attempted: usize,
    /// Entries confirmed and removed from the queue.
    pub synced: usize,
    /// Entries the remote service rejected or that could not be decoded.
    pub failed: usize,
    /// Entries held back behind an earlier failure for the same record.
    pub deferred: usize,
    /// Entries left in the queue afterwards.
    pub remaining: usize,
}

impl ReplayReport {
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.deferred == 0
    }
}

/// Ordered log of mutations awaiting remote acknowledgement.
#[derive(Debug, Clone)]
pub struct SyncQueue {
    store: LocalStore,
    coalesce_updates: bool,
}

impl SyncQueue {
    pub const fn new(store: LocalStore) -> Self {
        Self {
            store,
            coalesce_updates: true,
        }
    }

    /// Merge an `update` into an immediately preceding `update` of the same
    /// record instead of appending a second entry.
    #[must_use]
    pub const fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_updates = enabled;
        self
    }

    /// Append a mutation with the current timestamp.
    pub fn enqueue(
        &self,
        entity_type: EntityKind,
        operation: SyncOperation,
        payload: Value,
    ) -> Result<SyncQueueEntry> {
        let entry = SyncQueueEntry::new(entity_type, operation, payload);
        let coalesce = self.coalesce_updates && operation == SyncOperation::Update;

        self.store
            .modify::<SyncQueueEntry, _>(Collection::SyncQueue, |entries| {
                if coalesce {
                    if let Some(last) = entries.last_mut() {
                        if last.operation == SyncOperation::Update && last.same_entity(&entry) {
                            // A replay may already be sending the old payload
                            // under the old id; the merged entry must outlive it.
                            last.id = entry.id;
                            last.payload = entry.payload.clone();
                            last.timestamp = entry.timestamp;
                            tracing::debug!(
                                "Coalesced {} update into queued entry {}",
                                entity_type,
                                last.id
                            );
                            return Ok(last.clone());
                        }
                    }
                }
                entries.push(entry.clone());
                tracing::debug!(
                    "Queued {} {} ({} pending)",
                    entity_type,
                    operation,
                    entries.len()
                );
                Ok(entry)
            })
    }

    /// Append a mutation whose payload is a serialized record.
    pub fn enqueue_record<T: Serialize>(
        &self,
        entity_type: EntityKind,
        operation: SyncOperation,
        record: &T,
    ) -> Result<SyncQueueEntry> {
        self.enqueue(entity_type, operation, serde_json::to_value(record)?)
    }

    /// Queued entries in replay order.
    pub fn entries(&self) -> Vec<SyncQueueEntry> {
        self.store.read(Collection::SyncQueue)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued entry.
    pub fn clear(&self) -> Result<()> {
        self.store.write::<SyncQueueEntry>(Collection::SyncQueue, &[])
    }

    /// Ids of `kind` records that still have queued entries.
    pub fn pending_ids(&self, kind: EntityKind) -> HashSet<i64> {
        self.entries()
            .iter()
            .filter(|entry| entry.entity_type == kind)
            .filter_map(SyncQueueEntry::entity_id)
            .collect()
    }

    /// Ids of `kind` records whose latest queued entry is a delete.
    pub fn pending_deletes(&self, kind: EntityKind) -> HashSet<i64> {
        let mut deleted = HashSet::new();
        for entry in self.entries().iter().filter(|e| e.entity_type == kind) {
            let Some(id) = entry.entity_id() else {
                continue;
            };
            if entry.operation == SyncOperation::Delete {
                deleted.insert(id);
            } else {
                deleted.remove(&id);
            }
        }
        deleted
    }

    /// Replay every queued entry against `remote` in FIFO order.
    ///
    /// Entries appended while the replay is in flight are kept. Provisional
    /// ids confirmed by a successful create are rewritten in the remaining
    /// entries and in the local store.
    pub async fn replay<R: RemoteService>(&self, remote: &R) -> Result<ReplayReport> {
        let snapshot = self.entries();
        let mut report = ReplayReport::default();
        if snapshot.is_empty() {
            return Ok(report);
        }
        tracing::info!("Replaying {} queued mutation(s)", snapshot.len());

        let mut remap = IdRemap::default();
        let mut synced: HashSet<EntryId> = HashSet::new();
        let mut blocked: HashSet<(EntityKind, i64)> = HashSet::new();

        for mut entry in snapshot {
            remap.apply(&mut entry);

            if let Some(key) = blocking_key(&entry, &blocked) {
                tracing::debug!(
                    "Deferring {} {} behind earlier failure for {} {}",
                    entry.entity_type,
                    entry.operation,
                    key.0,
                    key.1
                );
                if let Some(id) = entry.entity_id() {
                    blocked.insert((entry.entity_type, id));
                }
                report.deferred += 1;
                continue;
            }

            report.attempted += 1;
            match replay_entry(remote, &entry).await {
                Ok(canonical_id) => {
                    if let (Some(provisional), Some(canonical)) = (entry.entity_id(), canonical_id)
                    {
                        remap.insert(entry.entity_type, provisional, canonical);
                    }
                    synced.insert(entry.id);
                    report.synced += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        "Sync failed for {} {} (entry {}): {}",
                        entry.entity_type,
                        entry.operation,
                        entry.id,
                        error
                    );
                    if let Some(id) = entry.entity_id() {
                        blocked.insert((entry.entity_type, id));
                    }
                    report.failed += 1;
                }
            }
        }

        if !remap.is_empty() {
            self.reconcile_local_ids(&remap)?;
        }

        report.remaining = self.store.modify::<SyncQueueEntry, _>(
            Collection::SyncQueue,
            |entries| {
                entries.retain(|entry| !synced.contains(&entry.id));
                for entry in entries.iter_mut() {
                    remap.apply(entry);
                }
                Ok(entries.len())
            },
        )?;

        tracing::info!(
            "Replay finished: {} synced, {} failed, {} deferred, {} remaining",
            report.synced,
            report.failed,
            report.deferred,
            report.remaining
        );
        Ok(report)
    }

    /// Move cached records from provisional to canonical ids.
    fn reconcile_local_ids(&self, remap: &IdRemap) -> Result<()> {
        self.store.modify_folders(|tree| {
            for (provisional, canonical) in remap.folders() {
                let (old, new) = (FolderId(provisional), FolderId(canonical));
                if !tree.rename_id(old, new) && tree.contains(old) {
                    // The canonical folder is already cached; drop the placeholder.
                    tree.remove(old);
                }
            }
            Ok(())
        })?;

        self.store.modify::<Note, _>(Collection::Notes, |notes| {
            for (provisional, canonical) in remap.notes() {
                let canonical_cached = notes.iter().any(|note| note.id == NoteId(canonical));
                if canonical_cached {
                    notes.retain(|note| note.id != NoteId(provisional));
                } else if let Some(note) = notes.iter_mut().find(|n| n.id == NoteId(provisional)) {
                    note.id = NoteId(canonical);
                }
            }
            for note in notes.iter_mut() {
                if let Some(folder_id) = note.folder_id {
                    if let Some(canonical) = remap.get(EntityKind::Folder, folder_id.get()) {
                        note.folder_id = Some(FolderId(canonical));
                    }
                }
            }
            Ok(())
        })
    }
}

/// Blocked record an entry has to wait behind, if any.
fn blocking_key(
    entry: &SyncQueueEntry,
    blocked: &HashSet<(EntityKind, i64)>,
) -> Option<(EntityKind, i64)> {
    if let Some(id) = entry.entity_id() {
        if blocked.contains(&(entry.entity_type, id)) {
            return Some((entry.entity_type, id));
        }
    }
    let reference_field = match entry.entity_type {
        EntityKind::Folder => "parent_id",
        EntityKind::Note => "folder_id",
    };
    let folder_ref = entry.payload.get(reference_field).and_then(Value::as_i64)?;
    blocked
        .contains(&(EntityKind::Folder, folder_ref))
        .then_some((EntityKind::Folder, folder_ref))
}

/// Send one entry. Returns the canonical id assigned by a create.
async fn replay_entry<R: RemoteService>(
    remote: &R,
    entry: &SyncQueueEntry,
) -> RemoteResult<Option<i64>> {
    match (entry.entity_type, entry.operation) {
        (EntityKind::Folder, SyncOperation::Create) => {
            let draft: FolderDraft = decode(entry)?;
            let folder = remote.create_folder(&draft).await?;
            Ok(Some(folder.id.get()))
        }
        (EntityKind::Folder, SyncOperation::Update) => {
            let id = FolderId(required_id(entry)?);
            let patch: FolderPatch = decode(entry)?;
            remote.update_folder(id, &patch).await?;
            Ok(None)
        }
        (EntityKind::Folder, SyncOperation::Delete) => {
            let id = FolderId(required_id(entry)?);
            absorb_not_found(remote.delete_folder(id).await.map(drop))?;
            Ok(None)
        }
        (EntityKind::Note, SyncOperation::Create) => {
            let draft: NoteDraft = decode(entry)?;
            let note = remote.create_note(&draft).await?;
            Ok(Some(note.id.get()))
        }
        (EntityKind::Note, SyncOperation::Update) => {
            let id = NoteId(required_id(entry)?);
            let patch: NotePatch = decode(entry)?;
            remote.update_note(id, &patch).await?;
            Ok(None)
        }
        (EntityKind::Note, SyncOperation::Delete) => {
            let id = NoteId(required_id(entry)?);
            absorb_not_found(remote.delete_note(id).await.map(drop))?;
            Ok(None)
        }
    }
}

/// A delete of a record the server no longer has is already in sync.
fn absorb_not_found(result: RemoteResult<()>) -> RemoteResult<()> {
    match result {
        Err(error) if error.is_not_found() => Ok(()),
        other => other,
    }
}

fn decode<T: DeserializeOwned>(entry: &SyncQueueEntry) -> RemoteResult<T> {
    serde_json::from_value(entry.payload.clone()).map_err(|error| {
        RemoteError::Decode(format!(
            "queued {} {} payload: {error}",
            entry.entity_type, entry.operation
        ))
    })
}

fn required_id(entry: &SyncQueueEntry) -> RemoteResult<i64> {
    entry.entity_id().ok_or_else(|| {
        RemoteError::Decode(format!(
            "queued {} {} payload has no id",
            entry.entity_type, entry.operation
        ))
    })
}
