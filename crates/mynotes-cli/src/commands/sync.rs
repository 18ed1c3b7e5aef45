use std::time::Duration;

use mynotes_core::ConnectivityProbe;
use serde::Serialize;

use crate::commands::common::{format_entry_lines, Service};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub api_base_url: String,
    pub online: bool,
    pub pending: usize,
}

pub async fn run_sync(service: &Service) -> Result<(), CliError> {
    if !service.is_online() {
        println!(
            "Offline; {} change(s) stay queued",
            service.pending().len()
        );
        return Ok(());
    }

    match service.replay().await? {
        Some(report) if report.is_clean() => {
            println!("Sync completed: {} change(s) synced", report.synced);
        }
        Some(report) => println!(
            "Sync incomplete: {} synced, {} failed, {} deferred, {} remaining",
            report.synced, report.failed, report.deferred, report.remaining
        ),
        None => println!("Sync skipped"),
    }
    Ok(())
}

pub fn run_sync_status(service: &Service, as_json: bool) -> Result<(), CliError> {
    let entries = service.pending();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No queued changes.");
        return Ok(());
    }

    for line in format_entry_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub fn status_report(service: &Service) -> StatusReport {
    StatusReport {
        api_base_url: service.remote().base_url().to_string(),
        online: service.is_online(),
        pending: service.pending().len(),
    }
}

pub fn run_status(service: &Service, as_json: bool) -> Result<(), CliError> {
    let report = status_report(service);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} ({}), {} queued change(s)",
            if report.online { "Online" } else { "Offline" },
            report.api_base_url,
            report.pending
        );
    }
    Ok(())
}

/// Probe until Ctrl-C, replaying the queue on every reconnect.
pub async fn run_watch(service: Service, interval: Duration) -> Result<(), CliError> {
    let service = std::sync::Arc::new(service);
    let listener = service.spawn_reconnect_listener();
    let probe = ConnectivityProbe::new(interval).spawn(
        service.remote().clone(),
        service.connectivity().clone(),
    );

    if service.is_online() {
        run_sync(&service).await?;
    }
    println!(
        "Watching {} every {}s; press Ctrl-C to stop",
        service.remote().base_url(),
        interval.as_secs()
    );

    tokio::signal::ctrl_c().await?;
    probe.abort();
    listener.abort();
    println!(
        "Stopped; {} change(s) queued",
        service.pending().len()
    );
    Ok(())
}
