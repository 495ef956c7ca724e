//! Upload store for input spreadsheets.
//!
//! Uploads land in a single sandbox directory as `<YYYYMMDD_HHMMSS>_<name>`.
//! Paths sent back by clients are only accepted if they resolve inside it.

use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use chrono::{DateTime, Local};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Multipart field carrying the spreadsheet.
pub const FILE_FIELD: &str = "file";

/// Accepted spreadsheet extensions.
const ALLOWED_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// Check if a filename has a spreadsheet extension.
pub fn is_spreadsheet(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Reduce a client-supplied filename to its final path component.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let normalized = filename.replace('\\', "/");
    let name = normalized.rsplit('/').next()?.trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return None;
    }
    Some(name.to_string())
}

/// Timestamped name an upload is stored under.
pub fn stored_name(filename: &str, now: DateTime<Local>) -> String {
    format!("{}_{}", now.format("%Y%m%d_%H%M%S"), filename)
}

/// Save the spreadsheet from a multipart upload and return its absolute path.
///
/// Fields other than [`FILE_FIELD`] are drained and ignored. A partially
/// written file is removed when the size limit is hit.
pub async fn save_upload(
    payload: &mut Multipart,
    uploads_dir: &Path,
    max_upload_size: usize,
) -> AppResult<PathBuf> {
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;

        if content_disposition.get_name() != Some(FILE_FIELD) {
            drain_field(&mut field).await;
            continue;
        }

        let original = content_disposition
            .get_filename()
            .ok_or_else(|| AppError::InvalidInput("Missing filename".to_string()))?
            .to_string();

        let filename = sanitize_filename(&original)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid filename: {}", original)))?;

        if !is_spreadsheet(&filename) {
            drain_field(&mut field).await;
            return Err(AppError::InvalidInput(
                "Only Excel files (.xlsx or .xls) are allowed".to_string(),
            ));
        }

        let path = uploads_dir.join(stored_name(&filename, Local::now()));
        write_field(&mut field, &path, max_upload_size).await?;

        let absolute = tokio::fs::canonicalize(&path).await.map_err(|e| {
            AppError::FileSystem(format!("Could not resolve {}: {}", path.display(), e))
        })?;
        info!("File uploaded successfully: {}", absolute.display());
        return Ok(absolute);
    }

    Err(AppError::InvalidInput("Error retrieving file".to_string()))
}

async fn write_field(field: &mut Field, path: &Path, max_upload_size: usize) -> AppResult<()> {
    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        AppError::FileSystem(format!("Could not create file {}: {}", path.display(), e))
    })?;

    let mut size: usize = 0;
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        size += data.len();

        if size > max_upload_size {
            drop(file);
            remove_partial(path).await;
            return Err(AppError::PayloadTooLarge(format!(
                "Upload exceeds {} bytes",
                max_upload_size
            )));
        }

        file.write_all(&data)
            .await
            .map_err(|e| AppError::FileSystem(format!("Failed to write file: {}", e)))?;
    }

    file.flush()
        .await
        .map_err(|e| AppError::FileSystem(format!("Failed to flush file: {}", e)))?;

    debug!("Wrote {} bytes to {}", size, path.display());
    Ok(())
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove partial upload {}: {}", path.display(), e);
    }
}

async fn drain_field(field: &mut Field) {
    while let Some(chunk) = field.next().await {
        let _ = chunk;
    }
}

/// Resolve a client-supplied upload path, requiring it to exist inside
/// `uploads_dir` once symlinks and `..` are resolved.
pub async fn resolve_upload_path(uploads_dir: &Path, requested: &str) -> AppResult<PathBuf> {
    if requested.trim().is_empty() {
        return Err(AppError::InvalidInput("filePath is required".to_string()));
    }

    let resolved = tokio::fs::canonicalize(requested)
        .await
        .map_err(|_| AppError::InvalidInput(format!("File does not exist: {}", requested)))?;

    let sandbox = tokio::fs::canonicalize(uploads_dir).await.map_err(|e| {
        AppError::FileSystem(format!(
            "Could not resolve uploads directory {}: {}",
            uploads_dir.display(),
            e
        ))
    })?;

    if !resolved.starts_with(&sandbox) || !resolved.is_file() {
        warn!(
            "Invalid file path: {} not in {}",
            resolved.display(),
            sandbox.display()
        );
        return Err(AppError::InvalidInput("Invalid file path".to_string()));
    }

    Ok(resolved)
}
