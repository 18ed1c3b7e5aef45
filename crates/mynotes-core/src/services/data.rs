//! Offline-first data access facade.
//!
//! Every read and write goes through [`DataService`]. While online it tries
//! the remote service first and mirrors the canonical result into the local
//! store. When offline, or when the remote call fails, it applies the change
//! to the local store, queues it for replay and returns the local record.
//! Network failures never reach the caller.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState, NetworkEvent, Transition};
use crate::error::{Error, Result};
use crate::models::{
    DeleteAck, EntityKind, Folder, FolderDraft, FolderId, FolderPatch, FolderTree, Note,
    NoteDraft, NoteId, NotePatch, SyncOperation, SyncQueueEntry,
};
use crate::remote::{HttpRemote, RemoteService};
use crate::store::{Collection, LocalStore};
use crate::sync::{ReplayReport, SyncQueue};
use crate::util::now;

/// Single entry point for folder and note reads and writes.
pub struct DataService<R> {
    remote: R,
    store: LocalStore,
    queue: SyncQueue,
    connectivity: ConnectivityMonitor,
    replay_lock: Mutex<()>,
}

impl<R> std::fmt::Debug for DataService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("connectivity", &self.connectivity.state())
            .finish_non_exhaustive()
    }
}

impl DataService<HttpRemote> {
    /// Wire an HTTP-backed service from client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let remote = HttpRemote::new(config.api_base_url.clone(), config.request_timeout())
            .map_err(|error| Error::Config(error.to_string()))?;
        let store = LocalStore::open_dir(config.resolved_data_dir()?)?;
        let connectivity = if config.start_offline {
            ConnectivityMonitor::offline()
        } else {
            ConnectivityMonitor::online()
        };
        Ok(Self::new(remote, store, connectivity).with_coalescing(config.coalesce_updates))
    }
}

impl<R: RemoteService> DataService<R> {
    pub fn new(remote: R, store: LocalStore, connectivity: ConnectivityMonitor) -> Self {
        Self {
            remote,
            queue: SyncQueue::new(store.clone()),
            store,
            connectivity,
            replay_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.queue = self.queue.with_coalescing(enabled);
        self
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Mutations still waiting for remote acknowledgement, oldest first.
    pub fn pending(&self) -> Vec<SyncQueueEntry> {
        self.queue.entries()
    }

    // Folders

    /// Folder hierarchy. Falls back to the local cache when the remote
    /// service is unavailable.
    pub async fn get_folders(&self) -> Result<Vec<Folder>> {
        if self.is_online() {
            match self.remote.list_folders().await {
                Ok(folders) => {
                    if let Err(error) = self.refresh_folders(&folders) {
                        tracing::warn!("Failed to cache fetched folders: {}", error);
                    }
                    return Ok(folders);
                }
                Err(error) => {
                    tracing::warn!("Fetching folders failed, using local cache: {}", error);
                }
            }
        } else {
            tracing::debug!("Offline; reading folders from local cache");
        }
        Ok(self.store.read_folders())
    }

    pub async fn create_folder(&self, draft: FolderDraft) -> Result<Folder> {
        if self.is_online() {
            match self.remote.create_folder(&draft).await {
                Ok(folder) => {
                    self.store.modify_folders(|tree| {
                        tree.upsert(folder.clone());
                        Ok(())
                    })?;
                    return Ok(folder);
                }
                Err(error) => {
                    tracing::warn!("Creating folder remotely failed, queueing: {}", error);
                }
            }
        }

        let folder = Folder::from_draft(FolderId(self.store.next_local_id()), &draft, now());
        self.store
            .modify_folders(|tree| tree.insert(folder.clone()))?;
        self.queue
            .enqueue_record(EntityKind::Folder, SyncOperation::Create, &folder)?;
        Ok(folder)
    }

    pub async fn update_folder(&self, id: FolderId, patch: FolderPatch) -> Result<Folder> {
        if self.is_online() {
            match self.remote.update_folder(id, &patch).await {
                Ok(folder) => {
                    self.store.modify_folders(|tree| {
                        tree.upsert(folder.clone());
                        Ok(())
                    })?;
                    return Ok(folder);
                }
                Err(error) => {
                    tracing::warn!("Updating folder {} remotely failed, queueing: {}", id, error);
                }
            }
        }

        let updated = self
            .store
            .modify_folders(|tree| tree.patch(id, &patch, now()))?;
        self.queue
            .enqueue_record(EntityKind::Folder, SyncOperation::Update, &updated)?;
        Ok(updated)
    }

    /// Delete a folder and its subfolders.
    pub async fn delete_folder(&self, id: FolderId) -> Result<DeleteAck> {
        if self.is_online() {
            match self.remote.delete_folder(id).await {
                Ok(ack) => {
                    self.store.modify_folders(|tree| {
                        tree.remove(id);
                        Ok(())
                    })?;
                    return Ok(ack);
                }
                Err(error) => {
                    tracing::warn!("Deleting folder {} remotely failed, queueing: {}", id, error);
                }
            }
        }

        let removed = self.store.modify_folders(|tree| {
            let removed = tree.remove(id);
            if removed.is_empty() {
                return Err(Error::NotFound(format!("folder {id}")));
            }
            Ok(removed)
        })?;
        tracing::debug!("Removed {} folder(s) locally", removed.len());
        self.queue.enqueue(
            EntityKind::Folder,
            SyncOperation::Delete,
            json!({ "id": id.get() }),
        )?;
        Ok(DeleteAck::folder_deleted())
    }

    // Notes

    /// Non-deleted notes, optionally only those of one folder.
    pub async fn get_notes(&self, folder_id: Option<FolderId>) -> Result<Vec<Note>> {
        if self.is_online() {
            match self.remote.list_notes(folder_id).await {
                Ok(notes) => {
                    if let Err(error) = self.refresh_notes(&notes, folder_id) {
                        tracing::warn!("Failed to cache fetched notes: {}", error);
                    }
                    return Ok(notes);
                }
                Err(error) => {
                    tracing::warn!("Fetching notes failed, using local cache: {}", error);
                }
            }
        } else {
            tracing::debug!("Offline; reading notes from local cache");
        }

        let notes: Vec<Note> = self.store.read(Collection::Notes);
        Ok(notes
            .into_iter()
            .filter(|note| !note.is_deleted)
            .filter(|note| folder_id.is_none() || note.folder_id == folder_id)
            .collect())
    }

    pub async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
        if self.is_online() {
            match self.remote.create_note(&draft).await {
                Ok(note) => {
                    self.cache_note(&note)?;
                    return Ok(note);
                }
                Err(error) => {
                    tracing::warn!("Creating note remotely failed, queueing: {}", error);
                }
            }
        }

        let note = Note::from_draft(NoteId(self.store.next_local_id()), &draft, now());
        self.store
            .modify::<Note, _>(Collection::Notes, |notes| {
                notes.push(note.clone());
                Ok(())
            })?;
        self.queue
            .enqueue_record(EntityKind::Note, SyncOperation::Create, &note)?;
        Ok(note)
    }

    pub async fn update_note(&self, id: NoteId, patch: NotePatch) -> Result<Note> {
        if self.is_online() {
            match self.remote.update_note(id, &patch).await {
                Ok(note) => {
                    self.cache_note(&note)?;
                    return Ok(note);
                }
                Err(error) => {
                    tracing::warn!("Updating note {} remotely failed, queueing: {}", id, error);
                }
            }
        }

        let updated = self.store.modify::<Note, _>(Collection::Notes, |notes| {
            let note = live_note_mut(notes, id)?;
            note.apply_patch(&patch, now());
            Ok(note.clone())
        })?;
        self.queue
            .enqueue_record(EntityKind::Note, SyncOperation::Update, &updated)?;
        Ok(updated)
    }

    /// Soft-delete a note. The local record is kept as a tombstone.
    pub async fn delete_note(&self, id: NoteId) -> Result<DeleteAck> {
        if self.is_online() {
            match self.remote.delete_note(id).await {
                Ok(ack) => {
                    self.store.modify::<Note, _>(Collection::Notes, |notes| {
                        if let Some(note) = notes.iter_mut().find(|note| note.id == id) {
                            note.mark_deleted(now());
                        }
                        Ok(())
                    })?;
                    return Ok(ack);
                }
                Err(error) => {
                    tracing::warn!("Deleting note {} remotely failed, queueing: {}", id, error);
                }
            }
        }

        self.store.modify::<Note, _>(Collection::Notes, |notes| {
            live_note_mut(notes, id)?.mark_deleted(now());
            Ok(())
        })?;
        self.queue.enqueue(
            EntityKind::Note,
            SyncOperation::Delete,
            json!({ "id": id.get() }),
        )?;
        Ok(DeleteAck::note_deleted())
    }

    // Sync

    /// Replay the sync queue now.
    ///
    /// Returns `None` when offline or when another replay is already running.
    pub async fn replay(&self) -> Result<Option<ReplayReport>> {
        if !self.is_online() {
            tracing::debug!("Offline; replay postponed");
            return Ok(None);
        }
        let Ok(_guard) = self.replay_lock.try_lock() else {
            tracing::debug!("Replay already in progress; skipping");
            return Ok(None);
        };
        self.queue.replay(&self.remote).await.map(Some)
    }

    /// Feed a host network event to the connectivity monitor and replay the
    /// queue on reconnect.
    pub async fn handle_network_event(&self, event: NetworkEvent) -> Result<Option<ReplayReport>> {
        match self.connectivity.handle(event) {
            Some(Transition::Reconnected) => self.replay().await,
            _ => Ok(None),
        }
    }

    fn cache_note(&self, note: &Note) -> Result<()> {
        self.store.modify::<Note, _>(Collection::Notes, |notes| {
            match notes.iter_mut().find(|cached| cached.id == note.id) {
                Some(cached) => *cached = note.clone(),
                None => notes.push(note.clone()),
            }
            Ok(())
        })
    }

    /// Replace the cached hierarchy with a fetched one, keeping local
    /// versions of folders that still have queued mutations.
    fn refresh_folders(&self, fetched: &[Folder]) -> Result<()> {
        let pending = self.queue.pending_ids(EntityKind::Folder);
        let deleted = self.queue.pending_deletes(EntityKind::Folder);

        self.store.modify_folders(|cached| {
            let mut fresh = FolderTree::from_nested(fetched.to_vec());
            for id in cached.ids() {
                if !pending.contains(&id.get()) || deleted.contains(&id.get()) {
                    continue;
                }
                if let Some(folder) = cached.get(id) {
                    fresh.upsert(folder.clone());
                }
            }
            for id in &deleted {
                fresh.remove(FolderId(*id));
            }
            *cached = fresh;
            Ok(())
        })
    }

    /// Merge fetched notes into the cache. A folder-filtered fetch only
    /// replaces notes of that folder; notes with queued mutations keep their
    /// local version.
    fn refresh_notes(&self, fetched: &[Note], folder_id: Option<FolderId>) -> Result<()> {
        let pending = self.queue.pending_ids(EntityKind::Note);

        self.store.modify::<Note, _>(Collection::Notes, |cached| {
            let fetched_ids: HashSet<NoteId> = fetched.iter().map(|note| note.id).collect();
            let in_scope = |note: &Note| folder_id.is_none() || note.folder_id == folder_id;

            let mut merged: Vec<Note> = cached
                .iter()
                .filter(|note| !in_scope(*note) && !fetched_ids.contains(&note.id))
                .cloned()
                .collect();

            for note in fetched {
                let local = cached
                    .iter()
                    .find(|cached| cached.id == note.id && pending.contains(&note.id.get()));
                merged.push(local.unwrap_or(note).clone());
            }

            merged.extend(
                cached
                    .iter()
                    .filter(|note| in_scope(*note) && !fetched_ids.contains(&note.id))
                    .filter(|note| pending.contains(&note.id.get()))
                    .cloned(),
            );

            *cached = merged;
            Ok(())
        })
    }
}

impl<R: RemoteService + 'static> DataService<R> {
    /// Replay the queue whenever the monitor reports the online state, e.g.
    /// when a [`ConnectivityProbe`](crate::connectivity::ConnectivityProbe)
    /// drives it. Runs until the returned task is aborted.
    pub fn spawn_reconnect_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut changes = service.connectivity.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let state = *changes.borrow_and_update();
                if state != ConnectivityState::Online {
                    continue;
                }
                if let Err(error) = service.replay().await {
                    tracing::warn!("Replay after reconnect failed: {}", error);
                }
            }
        })
    }
}

fn live_note_mut(notes: &mut [Note], id: NoteId) -> Result<&mut Note> {
    notes
        .iter_mut()
        .find(|note| note.id == id && !note.is_deleted)
        .ok_or_else(|| Error::NotFound(format!("note {id}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::default_folders;
    use crate::testing::FakeRemote;

    fn offline_service() -> DataService<FakeRemote> {
        DataService::new(
            FakeRemote::new(),
            LocalStore::in_memory(),
            ConnectivityMonitor::offline(),
        )
    }

    fn online_service(remote: FakeRemote) -> DataService<FakeRemote> {
        DataService::new(remote, LocalStore::in_memory(), ConnectivityMonitor::online())
    }

    fn note_in(id: i64, folder: i64) -> Note {
        Note::from_draft(
            NoteId(id),
            &NoteDraft::titled(format!("note {id}")).in_folder(FolderId(folder)),
            now(),
        )
    }

    #[tokio::test]
    async fn pristine_store_returns_default_folders() {
        let service = offline_service();
        let folders = service.get_folders().await.unwrap();
        assert_eq!(folders, default_folders());
        assert_eq!(folders[0].name, "Persönlich");
        assert_eq!(folders[1].subfolders[1].name, "Projekte");
    }

    #[tokio::test]
    async fn get_notes_filters_by_folder_in_order() {
        let service = offline_service();
        service
            .store()
            .write(
                Collection::Notes,
                &[note_in(1, 1), note_in(2, 2), note_in(3, 1)],
            )
            .unwrap();

        let notes = service.get_notes(Some(FolderId(1))).await.unwrap();
        let ids: Vec<NoteId> = notes.iter().map(|note| note.id).collect();
        assert_eq!(ids, vec![NoteId(1), NoteId(3)]);
    }

    #[tokio::test]
    async fn deleted_notes_are_hidden_from_listings() {
        let service = offline_service();
        let mut gone = note_in(2, 1);
        gone.is_deleted = true;
        service
            .store()
            .write(Collection::Notes, &[note_in(1, 1), gone])
            .unwrap();

        assert_eq!(service.get_notes(None).await.unwrap().len(), 1);
        assert_eq!(service.get_notes(Some(FolderId(1))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_note_keeps_tombstone_with_newer_timestamp() {
        let service = offline_service();
        let mut note = note_in(7, 1);
        note.created_at = now() - chrono::Duration::seconds(5);
        note.updated_at = Some(note.created_at);
        let before = note.last_modified();
        service
            .store()
            .write(Collection::Notes, std::slice::from_ref(&note))
            .unwrap();

        let ack = service.delete_note(NoteId(7)).await.unwrap();
        assert_eq!(ack, DeleteAck::note_deleted());

        let cached: Vec<Note> = service.store().read(Collection::Notes);
        assert_eq!(cached.len(), 1);
        assert!(cached[0].is_deleted);
        assert!(cached[0].updated_at.unwrap() > before);

        let pending = service.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, SyncOperation::Delete);
        assert_eq!(pending[0].payload, json!({"id": 7}));
    }

    #[tokio::test]
    async fn offline_moves_to_top_level_and_out_of_folder_reach_remote() {
        let service = online_service(FakeRemote::new());
        let parent = service.create_folder(FolderDraft::new("Eltern")).await.unwrap();
        let child = service
            .create_folder(FolderDraft::new("Kind").with_parent(parent.id))
            .await
            .unwrap();
        let note = service
            .create_note(NoteDraft::titled("lose").in_folder(child.id))
            .await
            .unwrap();

        service.connectivity().handle(NetworkEvent::Offline);
        service
            .update_folder(child.id, FolderPatch::move_to(None))
            .await
            .unwrap();
        service
            .update_note(
                note.id,
                NotePatch {
                    folder_id: Some(None),
                    ..NotePatch::default()
                },
            )
            .await
            .unwrap();

        let local = service.get_folders().await.unwrap();
        assert_eq!(local.len(), 2);
        assert!(local[0].subfolders.is_empty());
        assert_eq!(service.get_notes(None).await.unwrap()[0].folder_id, None);

        let report = service
            .handle_network_event(NetworkEvent::Online)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.synced, 2);

        let remote_folders = service.remote().folders();
        assert_eq!(remote_folders.len(), 2);
        assert_eq!(remote_folders[1].id, child.id);
        assert_eq!(remote_folders[1].parent_id, None);
        assert_eq!(service.remote().notes()[0].folder_id, None);
    }

    #[tokio::test]
    async fn offline_create_then_reconnect_empties_queue() {
        let service = offline_service();
        let note = service.create_note(NoteDraft::titled("A")).await.unwrap();
        assert!(note.id.get() > 0);
        assert!(service.remote().calls().is_empty());

        let pending = service.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, SyncOperation::Create);
        assert_eq!(pending[0].entity_type, EntityKind::Note);

        let report = service
            .handle_network_event(NetworkEvent::Online)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.synced, 1);
        assert!(service.pending().is_empty());
        assert_eq!(service.remote().notes()[0].title, "A");
    }

    #[tokio::test]
    async fn failing_remote_create_folder_falls_back_to_queue() {
        let remote = FakeRemote::new();
        remote.set_failing(true);
        let service = online_service(remote);

        let folder = service
            .create_folder(FolderDraft::new("Neu"))
            .await
            .unwrap();
        assert_eq!(folder.name, "Neu");
        assert_eq!(folder.icon, "📁");
        assert!(folder.created_at.is_some());

        let pending = service.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].entity_type, EntityKind::Folder);
        assert_eq!(pending[0].operation, SyncOperation::Create);
        assert_eq!(pending[0].entity_id(), Some(folder.id.get()));
    }

    #[tokio::test]
    async fn online_success_caches_canonical_record_without_queueing() {
        let service = online_service(FakeRemote::new());
        let note = service
            .create_note(NoteDraft::titled("online").with_content("<p>x</p>"))
            .await
            .unwrap();

        assert!(service.pending().is_empty());
        let cached: Vec<Note> = service.store().read(Collection::Notes);
        assert_eq!(cached, vec![note]);
    }

    #[tokio::test]
    async fn fallback_update_of_unknown_id_is_not_found() {
        let service = offline_service();
        let error = service
            .update_note(NoteId(42), NotePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));

        let error = service.delete_folder(FolderId(999)).await.unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
        assert!(service.pending().is_empty());
    }

    #[tokio::test]
    async fn offline_folder_edits_apply_to_arena() {
        let service = offline_service();
        let child = service
            .create_folder(FolderDraft::new("Rezepte").with_parent(FolderId(1)))
            .await
            .unwrap();
        service
            .update_folder(child.id, FolderPatch::rename("Kochen"))
            .await
            .unwrap();

        let folders = service.get_folders().await.unwrap();
        assert_eq!(folders[0].subfolders[2].name, "Kochen");

        service.delete_folder(FolderId(2)).await.unwrap();
        let folders = service.get_folders().await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(service.pending().len(), 3);
    }

    #[tokio::test]
    async fn offline_edits_converge_after_reconnect() {
        let service = offline_service();
        let folder = service
            .create_folder(FolderDraft::new("Reisen").with_icon("✈️"))
            .await
            .unwrap();
        let note = service
            .create_note(NoteDraft::titled("Packliste").in_folder(folder.id))
            .await
            .unwrap();
        service
            .update_note(
                note.id,
                NotePatch {
                    content: Some("<ul><li>Pass</li></ul>".to_string()),
                    ..NotePatch::default()
                },
            )
            .await
            .unwrap();
        let doomed = service.create_note(NoteDraft::titled("tmp")).await.unwrap();
        service.delete_note(doomed.id).await.unwrap();

        service
            .handle_network_event(NetworkEvent::Online)
            .await
            .unwrap();
        assert!(service.pending().is_empty());

        let remote_folders = service.remote().folders();
        assert_eq!(remote_folders.len(), 1);
        assert_eq!(remote_folders[0].icon, "✈️");

        let remote_notes = service.get_notes(None).await.unwrap();
        assert_eq!(remote_notes.len(), 1);
        assert_eq!(remote_notes[0].content, "<ul><li>Pass</li></ul>");
        assert_eq!(remote_notes[0].folder_id, Some(remote_folders[0].id));

        let local_notes: Vec<Note> = service
            .store()
            .read::<Note>(Collection::Notes)
            .into_iter()
            .filter(|note| !note.is_deleted)
            .collect();
        assert_eq!(local_notes, remote_notes);
    }

    #[tokio::test]
    async fn refresh_keeps_pending_local_records() {
        let remote = FakeRemote::new();
        remote.seed_note(note_in(1, 1));
        let service = online_service(remote.clone());

        remote.set_failing(true);
        let offline_note = service
            .create_note(NoteDraft::titled("local only").in_folder(FolderId(1)))
            .await
            .unwrap();
        remote.set_failing(false);
        service.connectivity().handle(NetworkEvent::Offline);
        service.connectivity().handle(NetworkEvent::Online);

        let fetched = service.get_notes(Some(FolderId(1))).await.unwrap();
        assert_eq!(fetched.len(), 1);

        let cached: Vec<Note> = service.store().read(Collection::Notes);
        assert!(cached.iter().any(|note| note.id == offline_note.id));
        assert!(cached.iter().any(|note| note.id == NoteId(1)));
    }

    #[tokio::test]
    async fn replay_is_skipped_while_offline() {
        let service = offline_service();
        service.create_note(NoteDraft::default()).await.unwrap();
        assert_eq!(service.replay().await.unwrap(), None);
        assert_eq!(service.pending().len(), 1);
    }

    #[tokio::test]
    async fn reconnect_listener_replays_on_external_transition() {
        let service = Arc::new(offline_service());
        service.create_note(NoteDraft::titled("queued")).await.unwrap();
        let listener = service.spawn_reconnect_listener();

        service.connectivity().handle(NetworkEvent::Online);
        for _ in 0..50 {
            if service.pending().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        listener.abort();
        assert!(service.pending().is_empty());
    }
}
