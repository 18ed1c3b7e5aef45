//! Local persisted state: folders, notes and the pending sync queue.
//!
//! Each collection is stored as one JSON array under a fixed key. Reads never
//! fail; a missing or unreadable collection is treated as empty. Every
//! read-modify-write runs under one lock and replaces the whole array, so
//! overlapping async operations cannot interleave partial updates.

mod backend;

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};

use crate::error::{Error, Result};
use crate::models::{default_folders, Folder, FolderTree};
use crate::util::unix_timestamp_millis;

/// Logical collections kept by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Folders,
    Notes,
    SyncQueue,
}

impl Collection {
    /// Fixed storage key of the collection.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Folders => "mynotes_folders",
            Self::Notes => "mynotes_notes",
            Self::SyncQueue => "mynotes_sync_queue",
        }
    }
}

/// Generates provisional ids for records created while offline.
///
/// Ids derive from the current time in milliseconds and are strictly
/// increasing within the process.
#[derive(Debug, Default)]
pub struct LocalIdGenerator {
    last: AtomicI64,
}

impl LocalIdGenerator {
    pub fn next_id(&self) -> i64 {
        let now = unix_timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

struct StoreInner {
    backend: Box<dyn KeyValueBackend>,
    write_lock: Mutex<()>,
    ids: LocalIdGenerator,
}

/// Shared handle to the local store. Clones refer to the same storage.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl LocalStore {
    pub fn new(backend: impl KeyValueBackend) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Box::new(backend),
                write_lock: Mutex::new(()),
                ids: LocalIdGenerator::default(),
            }),
        }
    }

    /// Open a file-backed store in `dir`.
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tracing::debug!("Opening local store at {}", dir.display());
        Ok(Self::new(FileBackend::open(dir)?))
    }

    /// Open an ephemeral in-memory store (primarily for tests).
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Next provisional record id.
    pub fn next_local_id(&self) -> i64 {
        self.inner.ids.next_id()
    }

    /// Records of a collection, or an empty list when nothing usable is stored.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        self.read_existing(collection).unwrap_or_default()
    }

    /// Records of a collection, `None` only when it was never persisted.
    ///
    /// A stored collection that cannot be loaded or decoded reads as empty.
    pub fn read_existing<T: DeserializeOwned>(&self, collection: Collection) -> Option<Vec<T>> {
        let raw = match self.inner.backend.load(collection.key()) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read {}: {}", collection.key(), error);
                return Some(Vec::new());
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Some(records),
            Err(error) => {
                tracing::warn!(
                    "Discarding unreadable {} collection: {}",
                    collection.key(),
                    error
                );
                Some(Vec::new())
            }
        }
    }

    /// Replace the whole collection.
    pub fn write<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<()> {
        let _guard = self.lock()?;
        self.write_unlocked(collection, records)
    }

    /// Read-modify-write a collection atomically with respect to other writers.
    ///
    /// Nothing is written when `f` returns an error.
    pub fn modify<T, R>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Vec<T>) -> Result<R>,
    ) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.lock()?;
        let mut records = self.read(collection);
        let result = f(&mut records)?;
        self.write_unlocked(collection, &records)?;
        Ok(result)
    }

    /// Cached folder hierarchy. Falls back to the built-in default set when
    /// folders were never persisted.
    pub fn read_folders(&self) -> Vec<Folder> {
        self.read_existing(Collection::Folders)
            .unwrap_or_else(default_folders)
    }

    /// Read-modify-write the folder hierarchy as an arena.
    pub fn modify_folders<R>(&self, f: impl FnOnce(&mut FolderTree) -> Result<R>) -> Result<R> {
        let _guard = self.lock()?;
        let mut tree = FolderTree::from_nested(self.read_folders());
        let result = f(&mut tree)?;
        self.write_unlocked(Collection::Folders, &tree.to_nested())?;
        Ok(result)
    }

    /// Drop every collection.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        for collection in [Collection::Folders, Collection::Notes, Collection::SyncQueue] {
            self.inner.backend.remove(collection.key())?;
        }
        Ok(())
    }

    fn write_unlocked<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<()> {
        let serialized = serde_json::to_string(records)?;
        self.inner.backend.save(collection.key(), &serialized)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.inner
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("local store lock poisoned".to_string()))
    }
}
