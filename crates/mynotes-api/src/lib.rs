//! mynotes-api - reference server for the MyNotes folders/notes API
//!
//! Keeps everything in memory. Serves the REST contract the MyNotes clients
//! sync against, under `/api`, plus `/health` for connectivity probes.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;

pub use config::ApiConfig;
pub use routes::{app_router, AppState};
