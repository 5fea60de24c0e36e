//! Typed Fitbit endpoint wrappers
//!
//! Every method takes the current bearer token and issues one logical
//! request; the activity list follows pagination and the daily metrics
//! issue one request per time series resource.

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::fitbit_config::{FitbitConfig, ACTIVITY_TIMESERIES_RESOURCES};
use crate::fetcher::fitbit_http::{build_http_client, FitbitHttpClient};
use crate::fetcher::fitbit_parser::FitbitParser;
use crate::fetcher::pagination::PaginationHelper;
use crate::fetcher::FetcherResult;
use crate::{ActivityLogEntry, ActivityMetricsDay, DateRange, WeightEntry};

/// Fitbit Web API client
#[derive(Debug, Clone)]
pub struct FitbitClient {
    http: FitbitHttpClient,
    config: Arc<FitbitConfig>,
}

impl FitbitClient {
    /// Create a client from an existing HTTP helper
    pub fn new(http: FitbitHttpClient, config: Arc<FitbitConfig>) -> Self {
        Self { http, config }
    }

    /// Build the HTTP client and wrap it around `rate_limiter`
    pub fn from_config(config: Arc<FitbitConfig>, rate_limiter: Arc<RateLimiter>) -> FetcherResult<Self> {
        let http = FitbitHttpClient::new(Arc::new(build_http_client()?), rate_limiter);
        Ok(Self::new(http, config))
    }

    /// Endpoint configuration
    pub fn config(&self) -> &Arc<FitbitConfig> {
        &self.config
    }

    /// Underlying HTTP helper, shared with the OAuth flow
    pub fn http(&self) -> &FitbitHttpClient {
        &self.http
    }

    /// All activities that started within `range`, in ascending order
    pub async fn activity_log_list(
        &self,
        bearer: &str,
        range: &DateRange,
    ) -> FetcherResult<Vec<ActivityLogEntry>> {
        let first_url = self.config.activity_list_url(range.start());
        let activities = PaginationHelper::paginate_activity_log(first_url, range.end(), |url| async move {
            let page: Value = self.http.get_json("activity_list", &url, bearer).await?;
            FitbitParser::parse_activity_page(page)
        })
        .await?;

        debug!(range = %range, count = activities.len(), "Activity log listed");
        Ok(activities)
    }

    /// Raw TCX export of activity `log_id`
    pub async fn activity_tcx(&self, bearer: &str, log_id: u64) -> FetcherResult<Bytes> {
        let url = self.config.activity_tcx_url(log_id);
        self.http.get_bytes("activity_tcx", &url, bearer).await
    }

    /// Weight log entries for `range` (at most 31 days)
    pub async fn weight_series(&self, bearer: &str, range: &DateRange) -> FetcherResult<Vec<WeightEntry>> {
        let url = self.config.weight_url(range.start(), range.end())?;
        let body: Value = self.http.get_json("weight", &url, bearer).await?;
        FitbitParser::parse_weight_log(&body)
    }

    /// Daily activity metrics for `range`, one record per day ordered by date
    pub async fn activity_metrics(
        &self,
        bearer: &str,
        range: &DateRange,
    ) -> FetcherResult<Vec<ActivityMetricsDay>> {
        let mut series = HashMap::with_capacity(ACTIVITY_TIMESERIES_RESOURCES.len());
        for resource in ACTIVITY_TIMESERIES_RESOURCES {
            let url = self
                .config
                .activity_timeseries_url(resource, range.start(), range.end())?;
            let body: Value = self.http.get_json("activity_timeseries", &url, bearer).await?;
            series.insert(resource, FitbitParser::parse_timeseries(resource, &body)?);
        }
        Ok(FitbitParser::merge_activity_metrics(&series))
    }
}
