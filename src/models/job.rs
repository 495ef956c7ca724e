//! Job domain models and DTOs.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Lifecycle state of a worker run.
///
/// `Canceled` is a completed run whose worker was killed on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Worker subprocess is (or may still be) running.
    Running,
    /// Worker exited and results were collected.
    Complete,
    /// Worker was killed through the cancel endpoint.
    Canceled,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Both `Complete` and `Canceled` are terminal.
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time copy of a job's fields, taken under the registry lock.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub id: String,
    pub state: LifecycleState,
    pub total_accounts: usize,
    pub success_accounts: usize,
    pub failed_accounts: usize,
    pub success_file_path: Option<PathBuf>,
    pub fail_file_path: Option<PathBuf>,
    pub start_time: DateTime<Local>,
    pub end_time: Option<DateTime<Local>>,
    pub upload_file_path: PathBuf,
    pub worker_count: u32,
}

impl JobSnapshot {
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Run time so far, or the full run time once the job has ended.
    pub fn elapsed(&self, now: DateTime<Local>) -> std::time::Duration {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).to_std().unwrap_or_default()
    }
}

/// Job summary for listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub process_id: String,
    pub status: LifecycleState,
    pub total_accounts: usize,
    pub success_accounts: usize,
    pub failed_accounts: usize,
    pub worker_count: u32,
    pub upload_file_path: String,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl From<&JobSnapshot> for JobSummary {
    fn from(job: &JobSnapshot) -> Self {
        Self {
            process_id: job.id.clone(),
            status: job.state,
            total_accounts: job.total_accounts,
            success_accounts: job.success_accounts,
            failed_accounts: job.failed_accounts,
            worker_count: job.worker_count,
            upload_file_path: job.upload_file_path.display().to_string(),
            start_time: job.start_time.to_rfc3339(),
            end_time: job.end_time.map(|t| t.to_rfc3339()),
        }
    }
}

/// Job list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobListResponse {
    pub processes: Vec<JobSummary>,
}
