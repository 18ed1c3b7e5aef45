use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] mynotes_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Folder name cannot be empty")]
    EmptyFolderName,
    #[error("Nothing to update; pass at least one of {0}")]
    NothingToUpdate(&'static str),
    #[error("Configuration error: {0}")]
    Config(String),
}
