//! Fitbit HTTP client helper module
//!
//! Provides the one HTTP client used for every Fitbit request with:
//! - Rate limit integration (one slot per request, taken before sending)
//! - Bearer token and form POST helpers
//! - Non-2xx statuses mapped to [`FetcherError::HttpStatus`]
//!
//! There is no retry here; see [`AuthenticatedCaller`](crate::downloader::AuthenticatedCaller).

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::HttpRequestMetrics;

/// TCP connect timeout for provider requests
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout for provider requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept in [`FetcherError::HttpStatus`]
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Build the shared reqwest client with the exporter's timeouts
pub fn build_http_client() -> FetcherResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("fitbit-export/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FetcherError::ClientConfig(e.to_string()))
}

/// Rate-limited HTTP client for all Fitbit API interactions
#[derive(Debug, Clone)]
pub struct FitbitHttpClient {
    client: Arc<Client>,
    rate_limiter: Arc<RateLimiter>,
}

impl FitbitHttpClient {
    /// Create new HTTP client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (Arc for cheap cloning)
    /// * `rate_limiter` - Process-wide rate limiter every request goes through
    pub fn new(client: Arc<Client>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            rate_limiter,
        }
    }

    /// Shared rate limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// GET `url` with a bearer token and deserialize the JSON body
    pub async fn get_json<T>(&self, endpoint: &'static str, url: &str, bearer: &str) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.client.get(url).bearer_auth(bearer);
        let response = self.send(endpoint, request).await?;
        response.json::<T>().await.map_err(|e| {
            FetcherError::ParseError(format!("Failed to deserialize {endpoint} response: {e}"))
        })
    }

    /// GET `url` with a bearer token and return the raw body
    pub async fn get_bytes(&self, endpoint: &'static str, url: &str, bearer: &str) -> FetcherResult<Bytes> {
        let request = self.client.get(url).bearer_auth(bearer);
        let response = self.send(endpoint, request).await?;
        response.bytes().await.map_err(FetcherError::from_reqwest)
    }

    /// POST an urlencoded form (no bearer token) and deserialize the JSON body
    pub async fn post_form<T>(
        &self,
        endpoint: &'static str,
        url: &str,
        form: &[(&str, &str)],
    ) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.client.post(url).form(form);
        let response = self.send(endpoint, request).await?;
        response.json::<T>().await.map_err(|e| {
            FetcherError::ParseError(format!("Failed to deserialize {endpoint} response: {e}"))
        })
    }

    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> FetcherResult<Response> {
        self.rate_limiter.acquire().await;

        let metrics = HttpRequestMetrics::start(endpoint);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics.record_network_error();
                return Err(FetcherError::from_reqwest(e));
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        debug!(
            correlation_id = metrics.correlation_id(),
            endpoint, "Request succeeded"
        );
        Ok(response)
    }
}
