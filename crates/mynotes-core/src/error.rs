//! Error types for mynotes-core

use thiserror::Error;

/// Result type alias using mynotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mynotes-core operations
///
/// Remote failures are deliberately absent: the data access layer absorbs
/// them and falls back to the local store. See [`crate::remote::RemoteError`].
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found in the local store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local persistence backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
