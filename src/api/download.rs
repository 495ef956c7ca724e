//! Result spreadsheet downloads.

use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::web;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::services::{ResultKind, ResultLocator};

/// Download the newest result spreadsheet of a category.
///
/// Picks the most recently modified `success_*` or `fail_*` file in the
/// results directory, regardless of which process wrote it.
#[utoipa::path(
    get,
    path = "/api/download/{type}",
    tag = "Downloads",
    params(
        ("type" = String, Path, description = "Result category: success or fail")
    ),
    responses(
        (status = 200, description = "Result spreadsheet",
            content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Invalid result type", body = crate::error::ErrorResponse),
        (status = 404, description = "No result file found", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_results(
    locator: web::Data<ResultLocator>,
    path: web::Path<String>,
) -> AppResult<NamedFile> {
    let kind = ResultKind::parse(&path.into_inner())
        .ok_or_else(|| AppError::InvalidInput("Invalid result type".to_string()))?;

    let lookup = locator.clone();
    let latest = web::block(move || lookup.latest(kind))
        .await?
        .ok_or_else(|| AppError::NotFound("Result file".to_string()))?;

    let filename = latest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.xlsx", kind));

    let file = NamedFile::open_async(&latest).await.map_err(|e| {
        AppError::FileSystem(format!("Failed to open {}: {}", latest.display(), e))
    })?;

    info!("Serving {} result file {}", kind, latest.display());

    Ok(file.set_content_disposition(ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }))
}

/// Configure download routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/download/{type}").route(web::get().to(download_results)));
}
