//! Process lifecycle tests: start, progress, cancel, and listing.

use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_process_runs_to_completion() {
    let env = TestEnv::new();
    let (app, registry) = create_test_app(&env, accounts_reader(), 4096).await;

    let (status, started) = start_script(&app, &env.finishing_script(), json!("3")).await;
    assert_eq!(status, 200, "Process should start: {:?}", started);
    assert_eq!(started["totalAccounts"], 2);
    let id = started["processId"].as_str().unwrap().to_string();
    assert!(id.starts_with("process_"));

    let progress = wait_until_complete(&app, &id).await;
    assert_eq!(progress["progress"], 100.0);
    assert_eq!(progress["status"], "complete");
    // Recounted after the run: every row below the header.
    assert_eq!(progress["totalAccounts"], 3);
    assert_eq!(progress["successAccounts"], 1);
    assert_eq!(progress["failedAccounts"], 1);
    assert_eq!(progress["processingAccounts"], 1);
    assert_eq!(progress["successData"][0]["username"], "alice");
    assert_eq!(progress["successData"][0]["balance"], 1234.5);
    assert_eq!(progress["failData"][0]["reason"], "wrong password");

    assert_eq!(registry.get(&id).unwrap().worker_count, 3);

    // Canceling a finished process is a no-op.
    let (status, body) = post_json(&app, &format!("/api/cancel/{}", id), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (status, list) = get_json(&app, "/api/processes").await;
    assert_eq!(status, 200);
    assert_eq!(list["processes"][0]["processId"], id.as_str());
    assert_eq!(list["processes"][0]["status"], "complete");
}

#[actix_rt::test]
async fn test_cancel_running_process() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, accounts_reader(), 4096).await;

    let (status, started) = start_script(&app, "exec sleep 30\n", json!(2)).await;
    assert_eq!(status, 200, "Process should start: {:?}", started);
    let id = started["processId"].as_str().unwrap().to_string();

    let (status, progress) = get_json(&app, &format!("/api/progress/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(progress["isComplete"], false);
    assert!(progress["progress"].as_f64().unwrap() < 100.0);
    assert_eq!(progress["totalAccounts"], 2);
    assert_eq!(progress["processingAccounts"], 2);

    let (status, body) = post_json(&app, &format!("/api/cancel/{}", id), json!({})).await;
    assert_eq!(status, 200, "Cancel should succeed: {:?}", body);

    let (status, progress) = get_json(&app, &format!("/api/progress/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(progress["isComplete"], true);
    assert_eq!(progress["status"], "canceled");
    assert_eq!(progress["progress"], 100.0);
}

#[actix_rt::test]
async fn test_invalid_workers_fall_back_to_default() {
    let env = TestEnv::new();
    let (app, registry) = create_test_app(&env, accounts_reader(), 4096).await;

    let (status, started) = start_script(&app, "exit 0\n", json!("many")).await;
    assert_eq!(status, 200, "Process should start: {:?}", started);

    let id = started["processId"].as_str().unwrap();
    assert_eq!(registry.get(id).unwrap().worker_count, 2);
}

#[actix_rt::test]
async fn test_process_rejects_paths_outside_uploads() {
    let env = TestEnv::new();
    let (app, registry) = create_test_app(&env, accounts_reader(), 4096).await;

    let outside = env.root.path().join("accounts.xlsx");
    std::fs::write(&outside, "exit 0\n").unwrap();

    let (status, body) = post_json(
        &app,
        "/api/process",
        json!({ "filePath": outside.display().to_string(), "workers": "2" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, _) = post_json(
        &app,
        "/api/process",
        json!({ "filePath": env.uploads.join("missing.xlsx").display().to_string() }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(registry.list().is_empty());
}

#[actix_rt::test]
async fn test_unknown_process_is_not_found() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 4096).await;

    let (status, body) = get_json(&app, "/api/progress/process_missing").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = post_json(&app, "/api/cancel/process_missing", json!({})).await;
    assert_eq!(status, 404);
}
