//! Authorization through the loopback redirect listener

use super::support::{date, range, Workspace};
use fitbit_export::auth::{AuthorizationPrompt, TokenStore};
use fitbit_export::downloader::{ExportExecutor, ExportKind, RateLimiter};
use fitbit_export::fetcher::FitbitConfig;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plays the user: follows the authorization URL straight to the redirect
#[derive(Default)]
struct BrowserPrompt {
    seen: Mutex<Vec<Url>>,
}

impl AuthorizationPrompt for BrowserPrompt {
    fn present(&self, url: &Url) {
        self.seen.lock().unwrap().push(url.clone());
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let redirect = format!(
            "{}?code=the-code&state={}",
            params["redirect_uri"], params["state"]
        );
        tokio::spawn(async move {
            reqwest::get(redirect).await.unwrap();
        });
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn test_first_run_authorizes_and_persists_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "issued-access",
            "refresh_token": "issued-refresh",
            "expires_in": 28800,
            "token_type": "Bearer",
            "scope": "weight activity",
            "user_id": "ABC123"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/body/log/weight/date/2023-01-01/2023-01-31.json"))
        .and(header("authorization", "Bearer issued-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .expect(1)
        .mount(&server)
        .await;

    let config = FitbitConfig {
        redirect_uri: format!("http://127.0.0.1:{}/", free_port()),
        ..FitbitConfig::with_base_url(server.uri())
    };
    let prompt = Arc::new(BrowserPrompt::default());
    let executor = ExportExecutor::from_config(Arc::new(config), Arc::new(RateLimiter::unlimited()))
        .unwrap()
        .with_prompt(prompt.clone());

    let workspace = Workspace::new();
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));
    executor.execute(&job).await.unwrap();

    let seen = prompt.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let params: std::collections::HashMap<_, _> = seen[0].query_pairs().into_owned().collect();
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["scope"], "activity heartrate location weight");
    assert_eq!(params["state"].len(), 64);

    let stored = TokenStore::in_cache_dir(workspace.cache.path())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(stored.access_token, "issued-access");
    assert_eq!(stored.user_id.as_deref(), Some("ABC123"));
    assert!(stored.ts > 0.0);
}

#[tokio::test]
async fn test_expired_credential_is_refreshed_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stale-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "refreshed-access",
            "refresh_token": "refreshed-refresh",
            "expires_in": 28800
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer refreshed-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"weight": []})))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::new();
    std::fs::write(
        workspace.cache.path().join(".auth"),
        r#"{"access_token":"stale-access","refresh_token":"stale-refresh","expires_in":3600,"ts":1000.0}"#,
    )
    .unwrap();

    let executor = super::support::executor(&server);
    let job = workspace.job(ExportKind::Weight, range(date(2023, 1, 1), date(2023, 1, 31)));
    executor.execute(&job).await.unwrap();

    let stored = TokenStore::in_cache_dir(workspace.cache.path())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(stored.refresh_token, "refreshed-refresh");
}
