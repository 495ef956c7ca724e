//! Domain error types for the account check server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::services::registry::RegistryError;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload exceeded the configured size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Worker subprocess could not be started
    #[error("Failed to start process: {0}")]
    Launch(String),

    /// Worker subprocess could not be killed
    #[error("Failed to kill process: {0}")]
    Termination(String),

    /// Local filesystem operation failed
    #[error("File system error: {0}")]
    FileSystem(String),
}

impl AppError {
    /// Machine-readable error code for the response body.
    fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Launch(_) => "LAUNCH_ERROR",
            AppError::Termination(_) => "TERMINATION_ERROR",
            AppError::FileSystem(_) => "FILE_SYSTEM_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Launch(_) | AppError::Termination(_) | AppError::FileSystem(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let response_message = match self {
            AppError::FileSystem(err_str) => {
                tracing::error!("File system error: {}", err_str);
                "An internal file system error occurred".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.error_code().to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => AppError::NotFound(format!("Process {}", id)),
            RegistryError::Launch(e) => AppError::Launch(e.to_string()),
            RegistryError::Termination { source, .. } => AppError::Termination(source.to_string()),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::FileSystem(format!("Blocking task failed: {}", err))
    }
}
