//! mynotes-core - Core library for MyNotes
//!
//! This crate contains the shared models, the local store, the sync queue,
//! connectivity tracking and the offline-first data access service used by
//! the MyNotes clients.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, ConnectivityState, NetworkEvent};
pub use error::{Error, Result};
pub use models::{Folder, FolderId, Note, NoteId};
pub use remote::{HttpRemote, RemoteError, RemoteService};
pub use services::DataService;
pub use store::LocalStore;
pub use sync::{ReplayReport, SyncQueue};
