//! Worker process endpoints: start, progress, cancel, and listing.

use actix_web::{HttpResponse, web};
use chrono::Local;
use tracing::info;

use crate::api::ApiSettings;
use crate::error::AppResult;
use crate::models::{
    CancelResponse, JobListResponse, JobSummary, ProgressSnapshot, StartProcessRequest,
    StartProcessResponse, WorkersField,
};
use crate::services::ProcessRegistry;
use crate::services::estimator::ProgressEstimator;
use crate::services::upload::resolve_upload_path;

/// Start the worker on an uploaded spreadsheet.
///
/// `workers` may be sent as a number or a string. Missing or invalid values
/// fall back to the server default.
#[utoipa::path(
    post,
    path = "/api/process",
    tag = "Processes",
    request_body = StartProcessRequest,
    responses(
        (status = 200, description = "Worker started", body = StartProcessResponse),
        (status = 400, description = "Invalid file path", body = crate::error::ErrorResponse),
        (status = 500, description = "Worker could not be started", body = crate::error::ErrorResponse),
    )
)]
pub async fn start_process(
    registry: web::Data<ProcessRegistry>,
    settings: web::Data<ApiSettings>,
    body: web::Json<StartProcessRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    info!(
        "Received process request - filePath: {}, workers: {:?}",
        body.file_path, body.workers
    );

    let upload_path = resolve_upload_path(&settings.uploads_dir, &body.file_path).await?;
    let workers = body
        .workers
        .as_ref()
        .and_then(WorkersField::value)
        .unwrap_or(settings.default_workers);

    let job = registry.create(upload_path, workers).await?;

    Ok(HttpResponse::Ok().json(StartProcessResponse {
        process_id: job.id,
        total_accounts: job.total_accounts,
    }))
}

/// Get the progress of a process.
///
/// Completed processes include the parsed success and fail records.
#[utoipa::path(
    get,
    path = "/api/progress/{id}",
    tag = "Processes",
    params(
        ("id" = String, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Current progress", body = ProgressSnapshot),
        (status = 404, description = "Process not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_progress(
    registry: web::Data<ProcessRegistry>,
    estimator: web::Data<ProgressEstimator>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let job = registry.get(&id)?;

    let estimate = web::block(move || estimator.estimate(&job, Local::now())).await?;

    if let Some(total) = estimate.recounted_total {
        registry.record_total(&id, total);
    }
    if let Some((success, failed)) = estimate.observed_counts {
        registry.record_counts(&id, success, failed);
    }

    Ok(HttpResponse::Ok().json(estimate.snapshot))
}

/// Cancel a running process. Canceling a finished process is a no-op.
#[utoipa::path(
    post,
    path = "/api/cancel/{id}",
    tag = "Processes",
    params(
        ("id" = String, Path, description = "Process ID")
    ),
    responses(
        (status = 200, description = "Process canceled", body = CancelResponse),
        (status = 404, description = "Process not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Worker could not be killed", body = crate::error::ErrorResponse),
    )
)]
pub async fn cancel_process(
    registry: web::Data<ProcessRegistry>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    registry.cancel(&id).await?;

    Ok(HttpResponse::Ok().json(CancelResponse::ok()))
}

/// List all processes, newest first.
#[utoipa::path(
    get,
    path = "/api/processes",
    tag = "Processes",
    responses(
        (status = 200, description = "Known processes", body = JobListResponse),
    )
)]
pub async fn list_processes(registry: web::Data<ProcessRegistry>) -> HttpResponse {
    let processes = registry.list().iter().map(JobSummary::from).collect();
    HttpResponse::Ok().json(JobListResponse { processes })
}

/// Configure process routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/process").route(web::post().to(start_process)))
        .service(web::resource("/progress/{id}").route(web::get().to(get_progress)))
        .service(web::resource("/cancel/{id}").route(web::post().to(cancel_process)))
        .service(web::resource("/processes").route(web::get().to(list_processes)));
}
