//! MyNotes CLI - folders and notes from the terminal
//!
//! Every command goes through the offline-first data service: when the notes
//! service cannot be reached, changes land in the local store and are queued
//! until `mynotes sync` or `mynotes watch` replays them.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, FolderCommands, NoteCommands, SyncCommands};
use crate::commands::common::{flush_pending, open_service, resolve_config, ConfigOverrides};
use crate::commands::folders::{
    run_folders_create, run_folders_delete, run_folders_list, run_folders_update,
};
use crate::commands::notes::{run_notes_add, run_notes_delete, run_notes_edit, run_notes_list};
use crate::commands::sync::{run_status, run_sync, run_sync_status, run_watch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mynotes=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&ConfigOverrides {
        config_path: cli.config,
        data_dir: cli.data_dir,
        api_url: cli.api_url,
        offline: cli.offline,
    })?;
    let service = open_service(&config).await?;

    match cli.command {
        Commands::Folders { command } => {
            flush_pending(&service).await?;
            match command {
                FolderCommands::List { json } => run_folders_list(&service, json).await?,
                FolderCommands::Create { name, icon, parent } => {
                    run_folders_create(&service, &name, icon, parent).await?;
                }
                FolderCommands::Update {
                    id,
                    name,
                    icon,
                    parent,
                    root,
                } => {
                    let parent = if root { Some(None) } else { parent.map(Some) };
                    run_folders_update(&service, id, name, icon, parent).await?;
                }
                FolderCommands::Delete { id } => run_folders_delete(&service, id).await?,
            }
        }
        Commands::Notes { command } => {
            flush_pending(&service).await?;
            match command {
                NoteCommands::List { folder, json } => {
                    run_notes_list(&service, folder, json).await?;
                }
                NoteCommands::Add {
                    title,
                    folder,
                    content,
                } => run_notes_add(&service, title, folder, &content).await?,
                NoteCommands::Edit {
                    id,
                    title,
                    content,
                    folder,
                    unfile,
                } => {
                    let folder = if unfile { Some(None) } else { folder.map(Some) };
                    run_notes_edit(&service, id, title, content, folder).await?;
                }
                NoteCommands::Delete { id } => run_notes_delete(&service, id).await?,
            }
        }
        Commands::Sync { command: None } => run_sync(&service).await?,
        Commands::Sync {
            command: Some(SyncCommands::Status { json }),
        } => run_sync_status(&service, json)?,
        Commands::Status { json } => run_status(&service, json)?,
        Commands::Watch { interval } => {
            let interval = interval.map_or_else(|| config.probe_interval(), Duration::from_secs);
            if interval.is_zero() {
                return Err(CliError::Config(
                    "--interval must be at least 1 second".to_string(),
                ));
            }
            run_watch(service, interval).await?;
        }
    }

    Ok(())
}
