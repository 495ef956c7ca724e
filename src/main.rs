//! Account Check Server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;
use std::sync::Arc;

use account_check_lib::api::{self, ApiDoc, ApiSettings};
use account_check_lib::config::Config;
use account_check_lib::middleware;
use account_check_lib::services::{
    ProcessRegistry, ProgressEstimator, ResultLocator, SpreadsheetReader, WorkerLauncher,
    XlsxReader,
};
use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{App, HttpServer, Result as ActixResult, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Directory holding the bundled web client.
#[derive(Clone)]
struct StaticDir(PathBuf);

/// Serve the web client's index page.
async fn index(static_dir: web::Data<StaticDir>) -> ActixResult<NamedFile> {
    Ok(NamedFile::open(static_dir.0.join("index.html"))?)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, ACS_PLACEHOLDER_FALLBACK must be off");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Account Check Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }
    if config.worker.allow_placeholder_fallback {
        warn!("Placeholder result rows are enabled");
    }

    // Create data directories
    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    tokio::fs::create_dir_all(&config.worker.results_dir).await?;
    info!("Uploads directory: {}", config.uploads_dir.display());
    info!("Results directory: {}", config.worker.results_dir.display());
    info!("Worker binary: {}", config.worker.binary.display());

    // Shared state
    let reader: Arc<dyn SpreadsheetReader> = Arc::new(XlsxReader);
    let locator = ResultLocator::new(config.worker.results_dir.clone())
        .with_fallback_dir(std::env::current_dir()?);
    let registry = ProcessRegistry::new(
        WorkerLauncher::new(config.worker.binary.clone()),
        locator.clone(),
        Arc::clone(&reader),
    );
    let estimator = ProgressEstimator::new(locator.clone(), reader, &config.worker);

    let registry = web::Data::new(registry);
    let estimator = web::Data::new(estimator);
    let locator = web::Data::new(locator);
    let settings = web::Data::new(ApiSettings::from(&config));

    let bind_address = config.bind_address();
    let max_upload_size = config.max_upload_size;
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();

    info!("Upload limit: {}MB", max_upload_size / 1024 / 1024);

    if static_dir.is_some() {
        info!("Static file serving enabled from {:?}", static_dir);
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    // Start HTTP server
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = if is_development {
            // Permissive CORS for development
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_origin("http://localhost:8080")
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        } else {
            // Restrictive CORS for production (same-origin only)
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        };

        let mut app = App::new()
            // Add CORS middleware (must be before other middleware)
            .wrap(cors)
            // Add request logging middleware
            .wrap(middleware::RequestLogger)
            // Add shared state
            .app_data(registry.clone())
            .app_data(estimator.clone())
            .app_data(locator.clone())
            .app_data(settings.clone())
            .app_data(web::PayloadConfig::new(max_upload_size * 2))
            // Configure API routes
            .service(web::scope("/api").configure(api::configure_routes))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            );

        // Serve the web client when ACS_STATIC_DIR is set
        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(StaticDir(dir.clone())))
                .service(Files::new("/css", dir.join("css")).prefer_utf8(true))
                .service(Files::new("/js", dir.join("js")).prefer_utf8(true))
                .service(Files::new("/img", dir.join("img")))
                .route("/", web::get().to(index));
        }

        app
    });

    // Set worker count
    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
