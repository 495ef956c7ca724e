//! Progress estimation for polling clients.
//!
//! The worker reports nothing while it runs, so progress comes from what is
//! visible on disk: result spreadsheets once the job is done, and partially
//! written ones (or elapsed time) before that.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::config::WorkerSettings;
use crate::models::{Account, JobSnapshot, ProgressSnapshot};
use crate::services::locator::{ResultKind, ResultLocator};
use crate::services::spreadsheet::{SpreadsheetReader, count_accounts, read_accounts};

/// Progress is capped here until the job is complete.
const RUNNING_CAP: f64 = 99.0;

/// Estimate plus the values the caller should write back to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub snapshot: ProgressSnapshot,
    /// Total recounted because the stored one was zero.
    pub recounted_total: Option<usize>,
    /// Success/fail counts observed for a running job.
    pub observed_counts: Option<(usize, usize)>,
}

/// Builds [`ProgressSnapshot`]s from job state and result files.
#[derive(Clone)]
pub struct ProgressEstimator {
    locator: ResultLocator,
    reader: Arc<dyn SpreadsheetReader>,
    assumed_duration: Duration,
    allow_placeholder_fallback: bool,
}

impl ProgressEstimator {
    pub fn new(
        locator: ResultLocator,
        reader: Arc<dyn SpreadsheetReader>,
        settings: &WorkerSettings,
    ) -> Self {
        Self {
            locator,
            reader,
            assumed_duration: settings.assumed_duration,
            allow_placeholder_fallback: settings.allow_placeholder_fallback,
        }
    }

    /// Estimate progress for `job`. Reads spreadsheets; run it off the async
    /// executor.
    pub fn estimate(&self, job: &JobSnapshot, now: DateTime<Local>) -> Estimate {
        if job.is_complete() {
            Estimate {
                snapshot: self.finished(job),
                recounted_total: None,
                observed_counts: None,
            }
        } else {
            self.running(job, now)
        }
    }

    fn finished(&self, job: &JobSnapshot) -> ProgressSnapshot {
        let success_records = self.records(job.success_file_path.as_deref(), ResultKind::Success);
        let fail_records = self.records(job.fail_file_path.as_deref(), ResultKind::Fail);

        let success = success_records.len();
        let failed = fail_records.len();
        let total = if job.total_accounts == 0 {
            success + failed
        } else {
            job.total_accounts
        };

        let mut snapshot = ProgressSnapshot {
            progress: 100.0,
            total_accounts: total,
            success_accounts: success,
            failed_accounts: failed,
            processing_accounts: processing(total, success, failed),
            is_complete: true,
            status: job.state,
            success_records,
            fail_records,
        };

        let nothing_found = job.success_file_path.is_none() && job.fail_file_path.is_none();
        if self.allow_placeholder_fallback
            && nothing_found
            && snapshot.success_records.is_empty()
            && snapshot.fail_records.is_empty()
        {
            warn!("No results for process {}, adding placeholder record", job.id);
            snapshot.success_records.push(Account::placeholder());
        }

        snapshot
    }

    fn records(&self, path: Option<&Path>, kind: ResultKind) -> Vec<Account> {
        let Some(path) = path else {
            info!("No {} file recorded", kind);
            return Vec::new();
        };

        match read_accounts(self.reader.as_ref(), path, kind) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Error reading {} file: {}", kind, e);
                Vec::new()
            }
        }
    }

    fn running(&self, job: &JobSnapshot, now: DateTime<Local>) -> Estimate {
        let mut total = job.total_accounts;
        let mut recounted_total = None;
        if total == 0 {
            match count_accounts(self.reader.as_ref(), &job.upload_file_path) {
                Ok(count) if count > 0 => {
                    total = count;
                    recounted_total = Some(count);
                }
                Ok(_) => {}
                Err(e) => debug!("Recount for {} failed: {}", job.id, e),
            }
        }

        let since = SystemTime::from(job.start_time);
        let today = now.date_naive();
        let partial = |kind| {
            self.locator
                .latest_since(kind, today, since)
                .map(|path| self.records(Some(path.as_path()), kind).len())
                .unwrap_or(0)
        };
        let success = job.success_accounts.max(partial(ResultKind::Success));
        let failed = job.failed_accounts.max(partial(ResultKind::Fail));

        let progress = if total > 0 {
            count_progress(total, success, failed)
        } else {
            time_progress(job.elapsed(now), self.assumed_duration)
        };

        Estimate {
            snapshot: ProgressSnapshot {
                progress,
                total_accounts: total,
                success_accounts: success,
                failed_accounts: failed,
                processing_accounts: processing(total, success, failed),
                is_complete: false,
                status: job.state,
                success_records: Vec::new(),
                fail_records: Vec::new(),
            },
            recounted_total,
            observed_counts: Some((success, failed)),
        }
    }
}

/// Share of accounts with a result, capped below 100.
pub fn count_progress(total: usize, success: usize, failed: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let done = (success + failed) as f64;
    (done / total as f64 * 100.0).min(RUNNING_CAP)
}

/// Elapsed share of the assumed run length, capped below 100.
pub fn time_progress(elapsed: Duration, assumed: Duration) -> f64 {
    if assumed.is_zero() {
        return 0.0;
    }
    (elapsed.as_secs_f64() / assumed.as_secs_f64() * 100.0).min(RUNNING_CAP)
}

/// Accounts without a result yet; never negative.
pub fn processing(total: usize, success: usize, failed: usize) -> usize {
    total.saturating_sub(success + failed)
}
