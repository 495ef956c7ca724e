//! Domain models for the account check server.

pub mod account;
pub mod job;
pub mod progress;

// Re-export commonly used types
pub use account::Account;
pub use job::{JobListResponse, JobSnapshot, JobSummary, LifecycleState};
pub use progress::{
    CancelResponse, ProgressSnapshot, StartProcessRequest, StartProcessResponse, UploadResponse,
    WorkersField,
};
