use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mynotes")]
#[command(about = "Folder-organized notes that keep working offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory of the local store
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the notes service (e.g. <http://localhost:8000/api>)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Work offline: never contact the notes service
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage folders
    Folders {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Manage notes
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Replay queued changes against the notes service
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Show connectivity and the number of queued changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe the notes service and replay queued changes whenever it comes back
    Watch {
        /// Seconds between probes (defaults to the configured interval)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum FolderCommands {
    /// Show the folder tree
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a folder
    Create {
        /// Folder name
        name: String,
        /// Folder icon
        #[arg(long)]
        icon: Option<String>,
        /// Parent folder ID
        #[arg(long, value_name = "ID")]
        parent: Option<i64>,
    },
    /// Rename, re-icon or move a folder
    Update {
        /// Folder ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// New parent folder ID
        #[arg(long, value_name = "ID")]
        parent: Option<i64>,
        /// Move the folder to the top level
        #[arg(long, conflicts_with = "parent")]
        root: bool,
    },
    /// Delete a folder and its subfolders
    Delete {
        /// Folder ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// List notes
    List {
        /// Only notes of this folder
        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(long)]
        title: Option<String>,
        /// Folder ID
        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
        /// Note content (read from stdin when omitted and piped)
        content: Vec<String>,
    },
    /// Edit a note
    Edit {
        /// Note ID
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Move the note to this folder
        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
        /// Take the note out of its folder
        #[arg(long, conflicts_with = "folder")]
        unfile: bool,
    },
    /// Delete a note
    Delete {
        /// Note ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List queued changes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
