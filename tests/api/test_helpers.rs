//! Shared test helpers for API tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use account_check_lib::api::{self, ApiSettings};
use account_check_lib::config::WorkerSettings;
use account_check_lib::middleware::RequestLogger;
use account_check_lib::services::spreadsheet::{SheetError, SpreadsheetReader};
use account_check_lib::services::{
    ProcessRegistry, ProgressEstimator, ResultLocator, WorkerLauncher,
};
use actix_web::{App, dev::ServiceResponse, test, web};
use serde_json::Value;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----account-check-test-boundary";

/// Serves canned rows for any path whose file name ends with a known suffix.
pub struct StubReader {
    sheets: Vec<(String, Vec<Vec<String>>)>,
}

impl StubReader {
    pub fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    pub fn with(mut self, suffix: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        self.sheets.push((suffix.to_string(), rows));
        self
    }
}

impl SpreadsheetReader for StubReader {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.sheets
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix.as_str()))
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| SheetError::NoSheets(path.to_path_buf()))
    }
}

/// Input sheet with two checkable accounts out of three rows.
pub fn accounts_reader() -> StubReader {
    StubReader::new()
        .with(
            "accounts.xlsx",
            &[
                &["#", "username", "password"],
                &["1", "alice", "pw1"],
                &["2", "bob", "pw2"],
                &["3", "carol", ""],
            ],
        )
        .with(
            "success_run.xlsx",
            &[
                &["username", "balance", "last deposit", "deposit time"],
                &["alice", "1,234.50", "100.00", "2024-01-01 10:00"],
            ],
        )
        .with(
            "fail_run.xlsx",
            &[
                &["username", "password", "reason"],
                &["bob", "pw2", "wrong password"],
            ],
        )
}

/// Scratch uploads and results directories.
pub struct TestEnv {
    pub root: TempDir,
    pub uploads: PathBuf,
    pub results: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let uploads = root.path().join("uploads");
        let results = root.path().join("results");
        std::fs::create_dir(&uploads).unwrap();
        std::fs::create_dir(&results).unwrap();
        Self {
            root,
            uploads,
            results,
        }
    }

    /// Worker script that writes both result files and exits.
    pub fn finishing_script(&self) -> String {
        format!(
            ": > '{0}/success_run.xlsx'\n: > '{0}/fail_run.xlsx'\n",
            self.results.display()
        )
    }
}

/// Create a test app over `env` with the given reader and upload limit.
pub async fn create_test_app(
    env: &TestEnv,
    reader: StubReader,
    max_upload_size: usize,
) -> (
    impl actix_web::dev::Service<
        actix_http::Request,
        Response = ServiceResponse,
        Error = actix_web::Error,
    >,
    ProcessRegistry,
) {
    let reader: Arc<dyn SpreadsheetReader> = Arc::new(reader);
    let locator = ResultLocator::new(env.results.clone()).with_fallback_dir(env.results.clone());
    let registry = ProcessRegistry::new(
        WorkerLauncher::new("/bin/sh"),
        locator.clone(),
        Arc::clone(&reader),
    );
    let worker = WorkerSettings {
        binary: PathBuf::from("/bin/sh"),
        default_workers: 2,
        results_dir: env.results.clone(),
        assumed_duration: Duration::from_secs(120),
        allow_placeholder_fallback: false,
    };
    let estimator = ProgressEstimator::new(locator.clone(), reader, &worker);
    let settings = ApiSettings {
        uploads_dir: env.uploads.clone(),
        max_upload_size,
        default_workers: worker.default_workers,
    };

    let app = test::init_service(
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(estimator))
            .app_data(web::Data::new(locator))
            .app_data(web::Data::new(settings))
            .service(web::scope("/api").configure(api::configure_routes)),
    )
    .await;

    (app, registry)
}

/// Build a multipart/form-data body with one file field.
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a file to /api/upload.
pub async fn upload<S>(app: &S, filename: &str, content: &[u8]) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body("file", filename, content))
        .to_request();

    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Upload `script` as `accounts.xlsx` and start it as a process.
pub async fn start_script<S>(app: &S, script: &str, workers: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, uploaded) = upload(app, "accounts.xlsx", script.as_bytes()).await;
    assert_eq!(status, 200, "Upload should succeed: {:?}", uploaded);

    post_json(
        app,
        "/api/process",
        serde_json::json!({
            "filePath": uploaded["filePath"],
            "workers": workers,
        }),
    )
    .await
}

pub async fn post_json<S>(app: &S, uri: &str, body: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri(uri)
        .set_json(body)
        .to_request();

    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();

    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Poll /api/progress/{id} until the process completes.
pub async fn wait_until_complete<S>(app: &S, id: &str) -> Value
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    for _ in 0..250 {
        let (status, body) = get_json(app, &format!("/api/progress/{}", id)).await;
        assert_eq!(status, 200, "Progress should be readable: {:?}", body);
        if body["isComplete"] == true {
            return body;
        }
        actix_rt::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("process {} did not complete in time", id);
}
