//! Activity TCX export: paginated list, empty-TCX policy and resume

use super::support::{activity, date, executor, range, tcx, Workspace};
use fitbit_export::downloader::ExportKind;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_PATH: &str = "/1/user/-/activities/list.json";

/// Two list pages; the second reaches past January and carries a cursor
/// that must not be followed
async fn mount_activity_list(server: &MockServer, expected_calls: u64) {
    let next = format!(
        "{}{LIST_PATH}?offset=100&limit=100&sort=asc&afterDate=2023-01-01",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("offset", "0"))
        .and(query_param("afterDate", "2023-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "activities": [
                activity(1, "tracker", "2023-01-02T07:30:00.000+01:00"),
                activity(2, "auto_detected", "2023-01-03T18:00:00.000+01:00"),
            ],
            "pagination": {"next": next, "previous": ""}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;

    let unreachable = format!(
        "{}{LIST_PATH}?offset=200&limit=100&sort=asc&afterDate=2023-01-01",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "activities": [
                activity(3, "manual", "2023-01-10T12:00:00.000+01:00"),
                activity(4, "tracker", "2023-02-05T09:00:00.000+01:00"),
            ],
            "pagination": {"next": unreachable, "previous": ""}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("offset", "200"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

async fn mount_tcx(server: &MockServer, log_id: u64, lines: usize, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/1/user/-/activities/{log_id}.tcx")))
        .respond_with(ResponseTemplate::new(200).set_body_string(tcx(lines)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_activity_export_end_to_end() {
    let server = MockServer::start().await;
    mount_activity_list(&server, 1).await;
    mount_tcx(&server, 1, 40, 1).await;
    mount_tcx(&server, 2, 40, 0).await;
    mount_tcx(&server, 3, 10, 1).await;
    mount_tcx(&server, 4, 40, 0).await;

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::ActivityTcx, range(date(2023, 1, 1), date(2023, 1, 31)));
    let summary = executor(&server).execute(&job).await.unwrap();

    assert_eq!(summary.units_total, 3);
    assert_eq!(summary.units_fetched, 1);
    assert_eq!(summary.units_empty, 2);

    assert_eq!(workspace.output_files(), vec!["exercise.1.tcx".to_string()]);
    assert_eq!(workspace.read_output("exercise.1.tcx"), tcx(40).into_bytes());

    // Auto-detected and sample-less activities are done without a file
    for key in [".exercise.1", ".exercise.2", ".exercise.3"] {
        assert!(workspace.has_marker(key), "missing marker {key}");
    }
    assert!(!workspace.has_marker(".exercise.4"));
    assert!(workspace.has_marker(".exercises.2023-01-01:2023-01-31"));

    // Cached list keeps the full provider objects
    let cached = std::fs::read_to_string(
        workspace
            .cache
            .path()
            .join(".exercises.2023-01-01:2023-01-31.jsonl"),
    )
    .unwrap();
    assert_eq!(cached.lines().count(), 3);
    assert!(cached.contains("\"activityName\":\"Run\""));
}

#[tokio::test]
async fn test_interrupted_export_resumes_after_last_marker() {
    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::ActivityTcx, range(date(2023, 1, 1), date(2023, 1, 31)));

    let first = MockServer::start().await;
    mount_activity_list(&first, 1).await;
    mount_tcx(&first, 1, 40, 1).await;
    mount_tcx(&first, 3, 40, 1).await;
    executor(&first).execute(&job).await.unwrap();

    // Simulate a crash after activity 1: activity 3's marker never landed
    std::fs::remove_file(workspace.cache.path().join(".exercise.3")).unwrap();
    std::fs::remove_file(workspace.output.path().join("exercise.3.tcx")).unwrap();
    let untouched = workspace.read_output("exercise.1.tcx");

    let second = MockServer::start().await;
    mount_activity_list(&second, 0).await;
    mount_tcx(&second, 1, 40, 0).await;
    mount_tcx(&second, 3, 30, 1).await;
    let summary = executor(&second).execute(&job).await.unwrap();

    assert_eq!(summary.units_skipped, 2);
    assert_eq!(summary.units_fetched, 1);
    assert_eq!(workspace.read_output("exercise.1.tcx"), untouched);
    assert_eq!(workspace.read_output("exercise.3.tcx"), tcx(30).into_bytes());
}

#[tokio::test]
async fn test_missing_list_cache_is_refetched() {
    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::ActivityTcx, range(date(2023, 1, 1), date(2023, 1, 31)));

    let first = MockServer::start().await;
    mount_activity_list(&first, 1).await;
    mount_tcx(&first, 1, 40, 1).await;
    mount_tcx(&first, 3, 40, 1).await;
    executor(&first).execute(&job).await.unwrap();

    std::fs::remove_file(
        workspace
            .cache
            .path()
            .join(".exercises.2023-01-01:2023-01-31.jsonl"),
    )
    .unwrap();

    let second = MockServer::start().await;
    mount_activity_list(&second, 1).await;
    mount_tcx(&second, 1, 40, 0).await;
    mount_tcx(&second, 3, 40, 0).await;
    let summary = executor(&second).execute(&job).await.unwrap();

    assert_eq!(summary.units_skipped, 3);
}
