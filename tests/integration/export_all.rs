//! `dump-all` runs weight, then daily activity, then activity TCX

use super::support::{date, executor, range, Workspace};
use fitbit_export::downloader::ExportKind;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_export_all_runs_kinds_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/body/log/weight/date/2023-04-01/2023-04-30.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/1/user/-/activities/[A-Za-z]+/date/2023-04-01/2023-04-30\.json$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "activities-steps": [],
            "activities-calories": [],
            "activities-distance": [],
            "activities-floors": [],
            "activities-activityCalories": [],
            "activities-minutesSedentary": [],
            "activities-minutesLightlyActive": [],
            "activities-minutesFairlyActive": [],
            "activities-minutesVeryActive": []
        })))
        .expect(9)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "activities": [],
            "pagination": {"next": ""}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::All, range(date(2023, 4, 1), date(2023, 4, 30)));
    let summary = executor(&server).execute(&job).await.unwrap();

    assert_eq!(summary.kind, ExportKind::All);
    assert_eq!(summary.units_total, 2);
    assert_eq!(summary.units_empty, 2);
    assert!(workspace.output_files().is_empty());

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert!(paths[0].contains("/body/log/weight/"));
    assert!(paths[1..10].iter().all(|p| p.contains("/date/2023-04-01/")));
    assert_eq!(paths[10], "/1/user/-/activities/list.json");
}
