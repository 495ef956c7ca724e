//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Account Check Server",
        version = "0.4.0",
        description = "Control plane for the batch account-checking worker: upload input sheets, run and cancel the worker, poll progress, and download results"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        // Upload endpoints
        api::upload::upload_file,
        // Process endpoints
        api::processes::start_process,
        api::processes::get_progress,
        api::processes::cancel_process,
        api::processes::list_processes,
        // Download endpoints
        api::download::download_results,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            // Processes
            models::LifecycleState,
            models::Account,
            models::WorkersField,
            models::StartProcessRequest,
            models::StartProcessResponse,
            models::ProgressSnapshot,
            models::CancelResponse,
            models::JobSummary,
            models::JobListResponse,
            // Uploads
            models::UploadResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Uploads", description = "Input spreadsheet uploads"),
        (name = "Processes", description = "Worker lifecycle and progress"),
        (name = "Downloads", description = "Result spreadsheet downloads")
    )
)]
pub struct ApiDoc;
