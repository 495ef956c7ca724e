//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Development default values.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_UPLOADS_DIR: &str = "./uploads";
    pub const DEV_RESULTS_DIR: &str = "../results";
    pub const DEV_WORKER_BINARY: &str = "../batch_login";
    pub const DEV_DEFAULT_WORKERS: u32 = 2;
    pub const DEV_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB per spreadsheet
    pub const DEV_ASSUMED_DURATION_SECS: u64 = 120;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Worker and progress-estimation settings.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Path to the external checking program
    pub binary: PathBuf,
    /// Worker count used when a request omits or mangles it
    pub default_workers: u32,
    /// Directory the worker writes result spreadsheets into
    pub results_dir: PathBuf,
    /// Nominal run time used by the time-based progress estimate
    pub assumed_duration: Duration,
    /// Synthesize a placeholder row when a finished job produced no results
    pub allow_placeholder_fallback: bool,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Sandbox directory for uploaded spreadsheets
    pub uploads_dir: PathBuf,
    /// Directory holding the web client (index.html, css/, js/, img/)
    pub static_dir: Option<PathBuf>,
    /// Maximum upload size in bytes (default: 10MB)
    pub max_upload_size: usize,
    /// Worker settings
    pub worker: WorkerSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `ACS_HOST`: Server host (default: 127.0.0.1)
    /// - `ACS_PORT`: Server port (default: 8080)
    /// - `ACS_UPLOADS_DIR`: Upload sandbox (default: ./uploads)
    /// - `ACS_RESULTS_DIR`: Worker results directory (default: ../results)
    /// - `ACS_WORKER_BINARY`: Worker executable (default: ../batch_login)
    /// - `ACS_DEFAULT_WORKERS`: Fallback worker count (default: 2)
    /// - `ACS_MAX_UPLOAD_SIZE`: Max upload size in bytes (default: 10MB)
    /// - `ACS_ASSUMED_DURATION_SECS`: Time-based progress horizon (default: 120)
    /// - `ACS_PLACEHOLDER_FALLBACK`: Placeholder result row (default: false)
    /// - `ACS_STATIC_DIR`: Web client directory (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("ACS_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("ACS_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("ACS_PORT must be a valid port number"))?;

        let uploads_dir = PathBuf::from(
            env::var("ACS_UPLOADS_DIR").unwrap_or_else(|_| defaults::DEV_UPLOADS_DIR.to_string()),
        );

        let results_dir = PathBuf::from(
            env::var("ACS_RESULTS_DIR").unwrap_or_else(|_| defaults::DEV_RESULTS_DIR.to_string()),
        );

        let binary = PathBuf::from(
            env::var("ACS_WORKER_BINARY")
                .unwrap_or_else(|_| defaults::DEV_WORKER_BINARY.to_string()),
        );

        let default_workers = env::var("ACS_DEFAULT_WORKERS")
            .unwrap_or_else(|_| defaults::DEV_DEFAULT_WORKERS.to_string())
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(ConfigError::InvalidValue(
                "ACS_DEFAULT_WORKERS must be a positive number",
            ))?;

        let max_upload_size = env::var("ACS_MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| defaults::DEV_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue("ACS_MAX_UPLOAD_SIZE must be a valid number"))?;

        let assumed_duration_secs = env::var("ACS_ASSUMED_DURATION_SECS")
            .unwrap_or_else(|_| defaults::DEV_ASSUMED_DURATION_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("ACS_ASSUMED_DURATION_SECS must be a valid number")
            })?;

        let allow_placeholder_fallback = match env::var("ACS_PLACEHOLDER_FALLBACK") {
            Ok(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue(
                "ACS_PLACEHOLDER_FALLBACK must be true or false",
            ))?,
            Err(_) => false,
        };

        let static_dir = env::var("ACS_STATIC_DIR").ok().map(PathBuf::from);

        let config = Config {
            environment,
            host,
            port,
            uploads_dir,
            static_dir,
            max_upload_size,
            worker: WorkerSettings {
                binary,
                default_workers,
                results_dir,
                assumed_duration: Duration::from_secs(assumed_duration_secs),
                allow_placeholder_fallback,
            },
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate settings that are tolerated in development but not in production.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.worker.allow_placeholder_fallback {
            errors.push(
                "ACS_PLACEHOLDER_FALLBACK is enabled. Placeholder rows are display-only and must not reach production."
                    .to_string(),
            );
        }

        if self.worker.assumed_duration.is_zero() {
            errors.push("ACS_ASSUMED_DURATION_SECS must be greater than zero.".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
