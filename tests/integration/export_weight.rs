//! Weight export: monthly chunking, empty months and idempotent reruns

use super::support::{date, executor, range, Workspace, ACCESS_TOKEN};
use fitbit_export::downloader::ExportKind;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_weight(server: &MockServer, start: &str, end: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/1/user/-/body/log/weight/date/{start}/{end}.json")))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_weight_export_writes_one_csv_per_month() {
    let server = MockServer::start().await;
    mount_weight(
        &server,
        "2023-01-15",
        "2023-01-31",
        serde_json::json!({"weight": [
            {"date": "2023-01-20", "weight": 80.5, "bmi": 24.1, "fat": 18.2},
            {"date": "2023-01-27", "weight": 80.1, "bmi": 24.0}
        ]}),
    )
    .await;
    mount_weight(&server, "2023-02-01", "2023-02-28", serde_json::json!({"weight": []})).await;
    mount_weight(
        &server,
        "2023-03-01",
        "2023-03-10",
        serde_json::json!({"weight": [{"date": "2023-03-02", "weight": 79.9, "bmi": 23.9}]}),
    )
    .await;

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 15), date(2023, 3, 10)));
    let summary = executor(&server).execute(&job).await.unwrap();

    assert_eq!(summary.units_total, 3);
    assert_eq!(summary.units_fetched, 2);
    assert_eq!(summary.units_empty, 1);

    assert_eq!(
        workspace.output_files(),
        vec![
            "weight.2023-01-15:2023-01-31.csv".to_string(),
            "weight.2023-03-01:2023-03-10.csv".to_string(),
        ]
    );
    assert_eq!(
        String::from_utf8(workspace.read_output("weight.2023-01-15:2023-01-31.csv")).unwrap(),
        "Body\nDate,Weight,BMI,Fat\n2023-01-20,80.5,24.1,18.2\n2023-01-27,80.1,24.0,0\n"
    );

    // The empty month is done even though it produced no file
    assert!(workspace.has_marker(".weight.2023-01-15:2023-01-31"));
    assert!(workspace.has_marker(".weight.2023-02-01:2023-02-28"));
    assert!(workspace.has_marker(".weight.2023-03-01:2023-03-10"));
}

#[tokio::test]
async fn test_second_run_makes_no_requests_and_keeps_files() {
    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));

    let first = MockServer::start().await;
    mount_weight(
        &first,
        "2023-01-01",
        "2023-01-31",
        serde_json::json!({"weight": [{"date": "2023-01-05", "weight": 81, "bmi": 24.3, "fat": 19}]}),
    )
    .await;
    executor(&first).execute(&job).await.unwrap();
    let before = workspace.read_output("weight.2023-01-01:2023-01-31.csv");

    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&second)
        .await;
    let summary = executor(&second).execute(&job).await.unwrap();

    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.units_fetched, 0);
    assert_eq!(workspace.read_output("weight.2023-01-01:2023-01-31.csv"), before);
}

#[tokio::test]
async fn test_rerun_resumes_at_first_unmarked_month() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/body/log/weight/date/2023-01-01/2023-01-31.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/body/log/weight/date/2023-02-01/2023-02-28.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::authorized();
    std::fs::write(workspace.cache.path().join(".weight.2023-01-01:2023-01-31"), b"").unwrap();

    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 2, 28)));
    let summary = executor(&server).execute(&job).await.unwrap();

    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.units_empty, 1);
}
