//! Fitbit endpoint configuration
//!
//! Base URLs, OAuth client settings and URL builders for every endpoint the
//! exporter touches. Keeping the base URLs in one struct lets tests point
//! the whole client at a local mock server.
//!
//! Reference: <https://dev.fitbit.com/build/reference/web-api/>

use chrono::NaiveDate;
use url::Url;

use crate::fetcher::{FetcherError, FetcherResult};

/// Public client id of the registered Fitbit application
pub const DEFAULT_CLIENT_ID: &str = "23RBKP";

/// Redirect URI registered for [`DEFAULT_CLIENT_ID`]
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";

/// Base URL of the Web API (also hosts the token endpoint)
pub const DEFAULT_API_BASE_URL: &str = "https://api.fitbit.com";

/// Base URL of the user-facing authorization pages
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://www.fitbit.com/oauth2";

/// Scopes requested during authorization
pub const OAUTH_SCOPE: &str = "activity heartrate location weight";

/// Web API version segment
pub const API_VERSION: u32 = 1;

/// Page size requested from the activity log list
pub const ACTIVITY_LIST_PAGE_LIMIT: u32 = 100;

/// Largest `end - start` distance (in days) the weight endpoint accepts
pub const WEIGHT_MAX_WINDOW_DAYS: i64 = 30;

/// Activity time series fetched for the daily metrics export, in request order
pub const ACTIVITY_TIMESERIES_RESOURCES: [&str; 9] = [
    "activityCalories",
    "calories",
    "distance",
    "floors",
    "minutesSedentary",
    "minutesLightlyActive",
    "minutesFairlyActive",
    "minutesVeryActive",
    "steps",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Endpoint and OAuth client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitbitConfig {
    /// OAuth client id
    pub client_id: String,
    /// Loopback redirect URI the callback listener binds to
    pub redirect_uri: String,
    /// Web API base URL, without trailing slash
    pub api_base_url: String,
    /// Authorization page base URL, without trailing slash
    pub oauth_base_url: String,
    /// Space separated OAuth scopes
    pub scope: String,
}

impl Default for FitbitConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            scope: OAUTH_SCOPE.to_string(),
        }
    }
}

impl FitbitConfig {
    /// Point both the Web API and the authorization pages at `base_url`
    ///
    /// Used by tests that run a single mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            oauth_base_url: format!("{base_url}/oauth2"),
            api_base_url: base_url,
            ..Self::default()
        }
    }

    /// Browser URL starting the PKCE authorization-code flow
    pub fn authorization_url(&self, state: &str, code_challenge: &str) -> FetcherResult<Url> {
        Url::parse_with_params(
            &format!("{}/authorize", self.oauth_base_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
                ("scope", self.scope.as_str()),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
                ("response_type", "code"),
            ],
        )
        .map_err(|e| FetcherError::ClientConfig(format!("invalid OAuth base URL: {e}")))
    }

    /// Token exchange and refresh endpoint
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base_url)
    }

    /// First page of the activity log list, ascending from `after_date`
    pub fn activity_list_url(&self, after_date: NaiveDate) -> String {
        format!(
            "{}/{API_VERSION}/user/-/activities/list.json?offset=0&limit={ACTIVITY_LIST_PAGE_LIMIT}&sort=asc&afterDate={}",
            self.api_base_url,
            after_date.format(DATE_FORMAT)
        )
    }

    /// TCX export of one logged activity
    pub fn activity_tcx_url(&self, log_id: u64) -> String {
        format!(
            "{}/{API_VERSION}/user/-/activities/{log_id}.tcx",
            self.api_base_url
        )
    }

    /// Weight log for `[start, end]`
    ///
    /// # Errors
    /// [`FetcherError::InvalidRange`] when `start > end` or the window is
    /// wider than [`WEIGHT_MAX_WINDOW_DAYS`].
    pub fn weight_url(&self, start: NaiveDate, end: NaiveDate) -> FetcherResult<String> {
        check_order(start, end)?;
        if (end - start).num_days() > WEIGHT_MAX_WINDOW_DAYS {
            return Err(FetcherError::InvalidRange(format!(
                "end date {end} is more than {WEIGHT_MAX_WINDOW_DAYS} days after start date {start}"
            )));
        }
        Ok(format!(
            "{}/{API_VERSION}/user/-/body/log/weight/date/{}/{}.json",
            self.api_base_url,
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        ))
    }

    /// Daily time series of one activity `resource` for `[start, end]`
    pub fn activity_timeseries_url(
        &self,
        resource: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FetcherResult<String> {
        check_order(start, end)?;
        Ok(format!(
            "{}/{API_VERSION}/user/-/activities/{resource}/date/{}/{}.json",
            self.api_base_url,
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        ))
    }
}

fn check_order(start: NaiveDate, end: NaiveDate) -> FetcherResult<()> {
    if start > end {
        return Err(FetcherError::InvalidRange(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}
