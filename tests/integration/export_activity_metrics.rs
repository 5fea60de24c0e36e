//! Daily activity export: per-resource series merged into monthly CSVs

use super::support::{date, executor, range, Workspace};
use fitbit_export::downloader::ExportKind;
use fitbit_export::fetcher::fitbit_config::ACTIVITY_TIMESERIES_RESOURCES;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount every resource for one chunk; `steps` gives the step count per day
async fn mount_series(server: &MockServer, start: &str, end: &str, days: &[(&str, u32)]) {
    for resource in ACTIVITY_TIMESERIES_RESOURCES {
        let points: Vec<_> = days
            .iter()
            .map(|(day, steps)| {
                let value = if resource == "steps" { steps.to_string() } else { "7".to_string() };
                serde_json::json!({"dateTime": day, "value": value})
            })
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/1/user/-/activities/{resource}/date/{start}/{end}.json")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ (format!("activities-{resource}")): points })),
            )
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_only_days_with_steps_are_exported() {
    let server = MockServer::start().await;
    mount_series(
        &server,
        "2023-01-30",
        "2023-01-31",
        &[("2023-01-30", 0), ("2023-01-31", 1234)],
    )
    .await;
    mount_series(&server, "2023-02-01", "2023-02-02", &[("2023-02-01", 0), ("2023-02-02", 0)]).await;

    let workspace = Workspace::authorized();
    let job = workspace.job(
        ExportKind::ActivityMetrics,
        range(date(2023, 1, 30), date(2023, 2, 2)),
    );
    let summary = executor(&server).execute(&job).await.unwrap();

    assert_eq!(summary.units_fetched, 1);
    assert_eq!(summary.units_empty, 1);
    assert_eq!(
        workspace.output_files(),
        vec!["activity.2023-01-30:2023-01-31.csv".to_string()]
    );

    let csv = String::from_utf8(workspace.read_output("activity.2023-01-30:2023-01-31.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Activities");
    assert!(lines[1].starts_with("Date,Calories Burned,Steps,"));
    assert_eq!(lines[2], "2023-01-31,7,1234,7,7,7,7,7,7,7");
    assert_eq!(lines.len(), 3);

    assert!(workspace.has_marker(".activity.2023-02-01:2023-02-02"));
}
