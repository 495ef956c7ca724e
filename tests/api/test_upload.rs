//! Upload endpoint tests.

use std::path::Path;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_upload_stores_timestamped_file_in_uploads_dir() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let (status, body) = upload(&app, "accounts.xlsx", b"sheet bytes").await;
    assert_eq!(status, 200, "Upload should succeed: {:?}", body);

    let path = Path::new(body["filePath"].as_str().unwrap());
    assert!(path.is_absolute());
    assert!(path.starts_with(env.uploads.canonicalize().unwrap()));

    let name = path.file_name().unwrap().to_string_lossy();
    assert!(name.ends_with("_accounts.xlsx"), "unexpected name {}", name);
    // YYYYMMDD_HHMMSS_ prefix
    assert_eq!(name.len(), "20240101_120000_accounts.xlsx".len());
    assert_eq!(std::fs::read(path).unwrap(), b"sheet bytes");
}

#[actix_rt::test]
async fn test_upload_rejects_non_spreadsheet() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let (status, body) = upload(&app, "accounts.csv", b"a,b,c").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    assert_eq!(std::fs::read_dir(&env.uploads).unwrap().count(), 0);
}

#[actix_rt::test]
async fn test_upload_strips_directory_components() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let (status, body) = upload(&app, "../../escape.xlsx", b"x").await;
    assert_eq!(status, 200, "Upload should succeed: {:?}", body);

    let path = Path::new(body["filePath"].as_str().unwrap());
    assert!(path.starts_with(env.uploads.canonicalize().unwrap()));
    assert!(!env.root.path().join("escape.xlsx").exists());
}

#[actix_rt::test]
async fn test_upload_rejects_oversized_file() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 16).await;

    let (status, body) = upload(&app, "big.xlsx", &[b'x'; 64]).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"], "PAYLOAD_TOO_LARGE");
    assert_eq!(std::fs::read_dir(&env.uploads).unwrap().count(), 0);
}

#[actix_rt::test]
async fn test_upload_without_file_field_is_rejected() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let req = actix_web::test::TestRequest::post()
        .uri("/api/upload")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body("attachment", "accounts.xlsx", b"x"))
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}
