//! Spreadsheet upload endpoint.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};

use crate::api::ApiSettings;
use crate::error::AppResult;
use crate::models::UploadResponse;
use crate::services::upload::save_upload;

/// Upload an input spreadsheet.
///
/// Content-Type: multipart/form-data with the spreadsheet in the `file` field.
/// Only `.xlsx` and `.xls` files are accepted. The returned path is what
/// `POST /api/process` expects.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Uploads",
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or non-spreadsheet file", body = crate::error::ErrorResponse),
        (status = 413, description = "File too large", body = crate::error::ErrorResponse),
    )
)]
pub async fn upload_file(
    settings: web::Data<ApiSettings>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let path = save_upload(&mut payload, &settings.uploads_dir, settings.max_upload_size).await?;

    Ok(HttpResponse::Ok().json(UploadResponse {
        file_path: path.display().to_string(),
    }))
}

/// Configure upload routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/upload").route(web::post().to(upload_file)));
}
