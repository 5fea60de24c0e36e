//! Transient failures are retried until the unit succeeds

use super::support::{date, executor, range, Workspace};
use fitbit_export::downloader::{ExportError, ExportKind, RetryPolicy};
use fitbit_export::fetcher::FetcherError;
use fitbit_export::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JANUARY: &str = "/1/user/-/body/log/weight/date/2023-01-01/2023-01-31.json";

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JANUARY))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JANUARY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "weight": [{"date": "2023-01-02", "weight": 70, "bmi": 22}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));
    let summary = executor(&server).execute(&job).await.unwrap();

    assert_eq!(summary.units_fetched, 1);
    assert!(workspace.has_marker(".weight.2023-01-01:2023-01-31"));
}

#[tokio::test]
async fn test_malformed_body_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JANUARY))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JANUARY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .mount(&server)
        .await;

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));
    let summary = executor(&server).execute(&job).await.unwrap();
    assert_eq!(summary.units_empty, 1);
}

#[tokio::test]
async fn test_unauthorized_request_refreshes_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JANUARY))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired_token"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "after-401",
            "refresh_token": "after-401-refresh",
            "expires_in": 28800
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JANUARY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));
    executor(&server).execute(&job).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_endless_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let shutdown = ShutdownCoordinator::shared();
    let executor = executor(&server)
        .with_retry_policy(RetryPolicy::fixed(Duration::from_millis(20)))
        .with_shutdown(Arc::clone(&shutdown));

    let workspace = Workspace::authorized();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));

    tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            shutdown.request_shutdown();
        }
    });

    let err = tokio::time::timeout(Duration::from_secs(5), executor.execute(&job))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ExportError::Interrupted));
    assert!(!workspace.has_marker(".weight.2023-01-01:2023-01-31"));
}

#[tokio::test]
async fn test_invalid_weight_window_is_fatal() {
    let server = MockServer::start().await;
    let client = fitbit_export::fetcher::FitbitClient::from_config(
        Arc::new(fitbit_export::fetcher::FitbitConfig::with_base_url(server.uri())),
        Arc::new(fitbit_export::downloader::RateLimiter::unlimited()),
    )
    .unwrap();

    // Monthly chunking never produces this; the client still rejects it
    let err = client
        .weight_series("token", &range(date(2023, 1, 1), date(2023, 3, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, FetcherError::InvalidRange(_)));
    assert!(!err.is_transient());
}
