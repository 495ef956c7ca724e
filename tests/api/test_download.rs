//! Result download tests.

use std::fs::File;
use std::time::{Duration, SystemTime};

use actix_web::http::header;
use actix_web::test;

use super::test_helpers::*;

fn touch(env: &TestEnv, name: &str, content: &[u8], modified: SystemTime) {
    let path = env.results.join(name);
    std::fs::write(&path, content).unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

#[actix_rt::test]
async fn test_download_serves_newest_file() {
    let env = TestEnv::new();
    let now = SystemTime::now();
    touch(&env, "success_b.xlsx", b"old", now - Duration::from_secs(3600));
    touch(&env, "success_a.xlsx", b"new", now);
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let req = test::TestRequest::get()
        .uri("/api/download/success")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("success_a.xlsx"));

    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"new");
}

#[actix_rt::test]
async fn test_download_rejects_unknown_type() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let (status, body) = get_json(&app, "/api/download/everything").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_download_without_results_is_not_found() {
    let env = TestEnv::new();
    touch(&env, "success_1.xlsx", b"x", SystemTime::now());
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let (status, body) = get_json(&app, "/api/download/fail").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
}
