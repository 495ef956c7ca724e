//! Process request/response DTOs and the progress snapshot.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::Account;
use super::job::LifecycleState;

/// Progress of one job as reported to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// 0-100; exactly 100 only once the job is complete.
    pub progress: f64,
    pub total_accounts: usize,
    pub success_accounts: usize,
    pub failed_accounts: usize,
    pub processing_accounts: usize,
    pub is_complete: bool,
    pub status: LifecycleState,
    #[serde(
        rename = "successData",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub success_records: Vec<Account>,
    #[serde(rename = "failData", default, skip_serializing_if = "Vec::is_empty")]
    pub fail_records: Vec<Account>,
}

/// Worker count as sent by clients: the web form posts it as a string.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum WorkersField {
    Number(i64),
    Text(String),
}

impl WorkersField {
    /// Positive worker count, if the client sent one.
    pub fn value(&self) -> Option<u32> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<i64>().ok()?,
        };
        u32::try_from(n).ok().filter(|n| *n >= 1)
    }
}

/// Start process request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessRequest {
    /// Path returned by the upload endpoint.
    pub file_path: String,
    /// Number of worker threads; falls back to the server default when invalid.
    #[serde(default)]
    pub workers: Option<WorkersField>,
}

/// Start process response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessResponse {
    pub process_id: String,
    pub total_accounts: usize,
}

/// Cancel response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelResponse {
    pub status: String,
}

impl CancelResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Upload response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Absolute path of the stored spreadsheet.
    pub file_path: String,
}
