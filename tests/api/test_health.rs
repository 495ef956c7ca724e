//! Health endpoint tests.

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health_reports_running_jobs() {
    let env = TestEnv::new();
    let (app, _) = create_test_app(&env, StubReader::new(), 1024).await;

    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["runningJobs"], 0);
    assert!(body["timestamp"].is_string());
}
