//! API endpoint modules.

use std::path::PathBuf;

use actix_web::web;

use crate::config::Config;

pub mod download;
pub mod health;
pub mod openapi;
pub mod processes;
pub mod upload;

pub use download::configure_routes as configure_download_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use processes::configure_routes as configure_process_routes;
pub use upload::configure_routes as configure_upload_routes;

/// Request-handling settings shared with the handlers.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub uploads_dir: PathBuf,
    pub max_upload_size: usize,
    pub default_workers: u32,
}

impl From<&Config> for ApiSettings {
    fn from(config: &Config) -> Self {
        Self {
            uploads_dir: config.uploads_dir.clone(),
            max_upload_size: config.max_upload_size,
            default_workers: config.worker.default_workers,
        }
    }
}

/// Mount every API route; call inside the `/api` scope.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_upload_routes)
        .configure(configure_process_routes)
        .configure(configure_download_routes);
}
