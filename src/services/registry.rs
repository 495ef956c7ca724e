//! In-memory registry of worker runs.
//!
//! Every read and write of a job goes through one mutex. Nothing awaits or
//! touches the filesystem while holding it: callers get [`JobSnapshot`] copies
//! and do their spreadsheet reads afterwards.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

use crate::models::{JobSnapshot, LifecycleState};
use crate::services::launcher::WorkerLauncher;
use crate::services::locator::{DiscoveredResults, ResultLocator};
use crate::services::spreadsheet::{SpreadsheetReader, count_accounts};
use crate::services::watcher;

/// Reply channel for a kill request, carrying the outcome of `Child::kill`.
pub(crate) type KillAck = oneshot::Sender<io::Result<()>>;

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("process {0} not found")]
    NotFound(String),

    #[error("failed to start worker: {0}")]
    Launch(#[source] io::Error),

    #[error("failed to terminate process {id}: {source}")]
    Termination {
        id: String,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a finished run, committed in one locked update.
#[derive(Debug, Clone, Default)]
pub struct Finalization {
    pub results: DiscoveredResults,
    /// Authoritative recount of the input sheet, if it could be read.
    pub total_accounts: Option<usize>,
    /// The worker was killed on request rather than exiting by itself.
    pub canceled: bool,
}

struct JobEntry {
    job: JobSnapshot,
    /// Taken by the first cancel; the watcher holds the receiving end.
    kill_switch: Option<oneshot::Sender<KillAck>>,
    /// Flips to `true` once a requested kill has played out or the job was
    /// finalized. Later cancels wait on it.
    kill_settled: watch::Sender<bool>,
}

impl JobEntry {
    fn new(job: JobSnapshot) -> (Self, oneshot::Receiver<KillAck>) {
        let (kill_tx, kill_rx) = oneshot::channel();
        let (kill_settled, _) = watch::channel(false);
        let entry = Self {
            job,
            kill_switch: Some(kill_tx),
            kill_settled,
        };
        (entry, kill_rx)
    }
}

/// What a cancel has to do once the lock is released.
enum PendingCancel {
    Kill(oneshot::Sender<KillAck>),
    AwaitKill(watch::Receiver<bool>),
}

/// Tracks worker runs from launch to completion.
#[derive(Clone)]
pub struct ProcessRegistry {
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
    sequence: Arc<AtomicU64>,
    launcher: WorkerLauncher,
    locator: ResultLocator,
    reader: Arc<dyn SpreadsheetReader>,
}

impl ProcessRegistry {
    pub fn new(
        launcher: WorkerLauncher,
        locator: ResultLocator,
        reader: Arc<dyn SpreadsheetReader>,
    ) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            sequence: Arc::new(AtomicU64::new(0)),
            launcher,
            locator,
            reader,
        }
    }

    pub fn locator(&self) -> &ResultLocator {
        &self.locator
    }

    pub fn reader(&self) -> Arc<dyn SpreadsheetReader> {
        Arc::clone(&self.reader)
    }

    /// Timestamp plus a sequence number, unique for the registry's lifetime.
    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("process_{}_{}", Local::now().format("%Y%m%d_%H%M%S"), seq)
    }

    /// Launch a worker for `upload_path` and start watching it.
    ///
    /// Returns the snapshot taken at insertion, carrying the pre-count of
    /// accounts (0 when the sheet could not be read).
    pub async fn create(
        &self,
        upload_path: PathBuf,
        workers: u32,
    ) -> Result<JobSnapshot, RegistryError> {
        let reader = self.reader();
        let count_path = upload_path.clone();
        let total_accounts =
            match tokio::task::spawn_blocking(move || count_accounts(reader.as_ref(), &count_path))
                .await
            {
                Ok(Ok(count)) => count,
                Ok(Err(e)) => {
                    warn!("Failed to count accounts: {}", e);
                    0
                }
                Err(e) => {
                    warn!("Account count task failed: {}", e);
                    0
                }
            };

        // No awaits from here on: a launched child always gets its watcher.
        let child = self
            .launcher
            .launch(&upload_path, workers)
            .map_err(RegistryError::Launch)?;

        let id = self.next_id();
        let job = JobSnapshot {
            id: id.clone(),
            state: LifecycleState::Running,
            total_accounts,
            success_accounts: 0,
            failed_accounts: 0,
            success_file_path: None,
            fail_file_path: None,
            start_time: Local::now(),
            end_time: None,
            upload_file_path: upload_path,
            worker_count: workers,
        };

        {
            let (entry, kill_rx) = JobEntry::new(job.clone());
            let mut jobs = self.jobs.lock();
            jobs.insert(id.clone(), entry);
            watcher::spawn(self.clone(), job.clone(), child, kill_rx);
        }

        info!(
            "Started process {} with {} accounts ({} workers)",
            id, total_accounts, workers
        );
        Ok(job)
    }

    /// Point-in-time copy of a job.
    pub fn get(&self, id: &str) -> Result<JobSnapshot, RegistryError> {
        self.jobs
            .lock()
            .get(id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Snapshots of every job, newest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut jobs: Vec<JobSnapshot> = self
            .jobs
            .lock()
            .values()
            .map(|entry| entry.job.clone())
            .collect();
        jobs.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        jobs
    }

    /// Number of jobs still running.
    pub fn running_count(&self) -> usize {
        self.jobs
            .lock()
            .values()
            .filter(|entry| !entry.job.is_complete())
            .count()
    }

    /// Kill a running worker and mark its job canceled.
    ///
    /// Canceling a finished job is a no-op. When the kill cannot be delivered
    /// the job is still marked canceled and the error is returned. A cancel
    /// that arrives while another one's kill is in flight waits for it.
    pub async fn cancel(&self, id: &str) -> Result<(), RegistryError> {
        let pending = {
            let mut jobs = self.jobs.lock();
            let entry = jobs
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            if entry.job.is_complete() {
                info!("Process {} already {}, nothing to cancel", id, entry.job.state);
                return Ok(());
            }
            match entry.kill_switch.take() {
                Some(switch) => PendingCancel::Kill(switch),
                None => PendingCancel::AwaitKill(entry.kill_settled.subscribe()),
            }
        };

        let outcome = match pending {
            PendingCancel::Kill(switch) => request_kill(switch).await,
            PendingCancel::AwaitKill(mut settled) => {
                info!("Kill for process {} already requested, waiting", id);
                // Err means the registry entry is gone; nothing left to wait for.
                let _ = settled.wait_for(|done| *done).await;
                Ok(())
            }
        };

        self.mark_canceled(id);

        outcome.map_err(|source| {
            warn!("Failed to kill process {}: {}", id, source);
            RegistryError::Termination {
                id: id.to_string(),
                source,
            }
        })
    }

    fn mark_canceled(&self, id: &str) {
        let mut jobs = self.jobs.lock();
        let Some(entry) = jobs.get_mut(id) else {
            return;
        };
        if entry.job.state == LifecycleState::Running {
            entry.job.state = LifecycleState::Canceled;
            entry.job.end_time = Some(Local::now());
            info!("Process {} canceled", id);
        }
        entry.kill_settled.send_replace(true);
    }

    /// Commit a finished run. Safe to apply more than once: discovered paths
    /// are only ever replaced by other found paths, never cleared.
    pub fn finalize(&self, id: &str, finalization: Finalization) {
        let mut jobs = self.jobs.lock();
        let Some(entry) = jobs.get_mut(id) else {
            warn!("Finalizing unknown process {}", id);
            return;
        };
        let job = &mut entry.job;

        if job.state == LifecycleState::Running {
            job.state = if finalization.canceled {
                LifecycleState::Canceled
            } else {
                LifecycleState::Complete
            };
        }
        job.end_time.get_or_insert_with(Local::now);

        if let Some(path) = finalization.results.success {
            job.success_file_path = Some(path);
        }
        if let Some(path) = finalization.results.fail {
            job.fail_file_path = Some(path);
        }
        if let Some(total) = finalization.total_accounts {
            job.total_accounts = total;
        }
        entry.kill_switch = None;
        entry.kill_settled.send_replace(true);

        info!(
            "Process {} finalized as {} (total: {}, success file: {:?}, fail file: {:?})",
            id, job.state, job.total_accounts, job.success_file_path, job.fail_file_path
        );
    }

    /// Raise the observed success/fail counters; they never go down.
    pub fn record_counts(&self, id: &str, success: usize, failed: usize) {
        if let Some(entry) = self.jobs.lock().get_mut(id) {
            entry.job.success_accounts = entry.job.success_accounts.max(success);
            entry.job.failed_accounts = entry.job.failed_accounts.max(failed);
        }
    }

    /// Store a lazily recounted total if none was known.
    pub fn record_total(&self, id: &str, total: usize) {
        if let Some(entry) = self.jobs.lock().get_mut(id)
            && entry.job.total_accounts == 0
        {
            entry.job.total_accounts = total;
        }
    }

    /// Register a running job with no worker behind it. The caller plays the
    /// watcher and answers kill requests on the returned receiver.
    #[cfg(test)]
    pub(crate) fn insert_unwatched(
        &self,
        upload_path: PathBuf,
    ) -> (String, oneshot::Receiver<KillAck>) {
        let id = self.next_id();
        let job = JobSnapshot {
            id: id.clone(),
            state: LifecycleState::Running,
            total_accounts: 0,
            success_accounts: 0,
            failed_accounts: 0,
            success_file_path: None,
            fail_file_path: None,
            start_time: Local::now(),
            end_time: None,
            upload_file_path: upload_path,
            worker_count: 1,
        };
        let (entry, kill_rx) = JobEntry::new(job);
        self.jobs.lock().insert(id.clone(), entry);
        (id, kill_rx)
    }
}

/// Ask the watcher to kill its child and wait for the outcome.
async fn request_kill(switch: oneshot::Sender<KillAck>) -> io::Result<()> {
    let (ack_tx, ack_rx) = oneshot::channel();
    if switch.send(ack_tx).is_err() {
        // Watcher already saw the exit; nothing left to kill.
        return Ok(());
    }
    ack_rx.await.unwrap_or(Ok(()))
}
