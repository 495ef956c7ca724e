//! Completion watcher: one background task per job.
//!
//! The watcher owns the worker's `Child`. It waits for the worker to exit (or
//! kills it when the registry forwards a cancel), then discovers result files,
//! recounts the input sheet, and commits everything in one registry update.

use std::process::ExitStatus;

use tokio::process::Child;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::models::JobSnapshot;
use crate::services::locator::ResultLocator;
use crate::services::registry::{Finalization, KillAck, ProcessRegistry};
use crate::services::spreadsheet::{SpreadsheetReader, count_data_rows};

enum Exit {
    Natural(std::io::Result<ExitStatus>),
    KillRequested(KillAck),
}

/// Spawn the watcher for a freshly inserted job. Outstanding watchers are
/// abandoned on shutdown.
pub(crate) fn spawn(
    registry: ProcessRegistry,
    job: JobSnapshot,
    child: Child,
    kill_rx: oneshot::Receiver<KillAck>,
) {
    tokio::spawn(watch(registry, job, child, kill_rx));
}

async fn watch(
    registry: ProcessRegistry,
    job: JobSnapshot,
    mut child: Child,
    mut kill_rx: oneshot::Receiver<KillAck>,
) {
    let exit = tokio::select! {
        status = child.wait() => Exit::Natural(status),
        Ok(ack) = &mut kill_rx => Exit::KillRequested(ack),
    };
    drop(kill_rx);

    let (status, canceled) = match exit {
        Exit::Natural(status) => (status, false),
        Exit::KillRequested(ack) => {
            info!("Killing process {}", job.id);
            let killed = child.kill().await;
            let _ = ack.send(killed);
            (child.wait().await, true)
        }
    };

    match status {
        Ok(status) if status.success() => info!("Process {} completed successfully", job.id),
        Ok(status) => warn!("Process {} completed with error: {}", job.id, status),
        Err(e) => error!("Failed to wait for process {}: {}", job.id, e),
    }

    let locator = registry.locator().clone();
    let reader = registry.reader();
    let blocking_job = job.clone();
    let finalization = tokio::task::spawn_blocking(move || {
        collect(&locator, reader.as_ref(), &blocking_job, canceled)
    })
    .await
    .unwrap_or_else(|e| {
        error!("Result collection for process {} failed: {}", job.id, e);
        Finalization {
            canceled,
            ..Finalization::default()
        }
    });

    registry.finalize(&job.id, finalization);
}

/// Discover result files and recount the input sheet. Blocking.
fn collect(
    locator: &ResultLocator,
    reader: &dyn SpreadsheetReader,
    job: &JobSnapshot,
    canceled: bool,
) -> Finalization {
    let results = locator.discover();
    if results.is_empty() {
        warn!(
            "No result files found after process {} completed",
            job.id
        );
    }

    let total_accounts = match count_data_rows(reader, &job.upload_file_path) {
        Ok(total) => Some(total),
        Err(e) => {
            warn!("Keeping previous account total for {}: {}", job.id, e);
            None
        }
    };

    Finalization {
        results,
        total_accounts,
        canceled,
    }
}
