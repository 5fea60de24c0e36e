//! Export commands

use crate::downloader::{ExportExecutor, ExportJob, ExportKind, ExportSummary, RateLimiter, RetryPolicy};
use crate::downloader::config::{API_RATE_INTERVAL, API_RATE_LIMIT, DEFAULT_CACHE_DIR, DEFAULT_OUTPUT_DIR};
use crate::fetcher::fitbit_config::{
    DEFAULT_API_BASE_URL, DEFAULT_CLIENT_ID, DEFAULT_OAUTH_BASE_URL, DEFAULT_REDIRECT_URI, OAUTH_SCOPE,
};
use crate::fetcher::FitbitConfig;
use crate::shutdown::SharedShutdown;
use crate::DateRange;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::CliError;

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{input}' (expected YYYY-MM-DD): {e}"))
}

/// Fitbit history exporter command-line interface
#[derive(Parser, Debug)]
#[command(name = "fitbit-export")]
#[command(about = "Export Fitbit activities, daily activity and weight history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// OAuth client id of the registered application
    #[arg(long, global = true, env = "FITBIT_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Redirect URI registered for the client; served locally during login
    #[arg(long, global = true, env = "FITBIT_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
    pub redirect_uri: String,

    /// Web API base URL
    #[arg(long, global = true, env = "FITBIT_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Authorization page base URL
    #[arg(long, global = true, env = "FITBIT_OAUTH_BASE_URL", default_value = DEFAULT_OAUTH_BASE_URL)]
    pub oauth_base_url: String,

    /// Requests allowed per rate window
    #[arg(long, global = true, default_value_t = API_RATE_LIMIT)]
    pub rate_limit: usize,

    /// Rate window length in seconds
    #[arg(long, global = true, default_value_t = API_RATE_INTERVAL.as_secs())]
    pub rate_interval_secs: u64,

    /// Pause between retry attempts in seconds (0 retries immediately)
    #[arg(long, global = true, default_value_t = 0)]
    pub retry_delay_secs: u64,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true, env = "FITBIT_EXPORT_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export one TCX file per recorded exercise
    DumpActivityTcx(RangeArgs),

    /// Export monthly body weight CSV files
    DumpWeight(RangeArgs),

    /// Export monthly daily-activity CSV files
    DumpActivity(RangeArgs),

    /// Export weight, daily activity and exercise TCX, in that order
    DumpAll(RangeArgs),
}

impl Commands {
    /// Export kind and range arguments of this command
    pub fn job_parts(&self) -> (ExportKind, &RangeArgs) {
        match self {
            Self::DumpActivityTcx(args) => (ExportKind::ActivityTcx, args),
            Self::DumpWeight(args) => (ExportKind::Weight, args),
            Self::DumpActivity(args) => (ExportKind::ActivityMetrics, args),
            Self::DumpAll(args) => (ExportKind::All, args),
        }
    }
}

/// Options shared by every export command
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Directory for credentials and done-markers
    #[arg(short = 'c', long = "cache-directory", default_value = DEFAULT_CACHE_DIR)]
    pub cache_directory: PathBuf,

    /// Directory for exported files
    #[arg(short = 'd', long = "directory", default_value = DEFAULT_OUTPUT_DIR)]
    pub directory: PathBuf,

    /// First day to export (YYYY-MM-DD)
    #[arg(short = 's', long = "start-date", value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last day to export (YYYY-MM-DD, default: today)
    #[arg(short = 'e', long = "end-date", value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,
}

impl RangeArgs {
    /// Requested range; the end date defaults to today in local time
    pub fn range(&self) -> Result<DateRange, CliError> {
        let end = self.end_date.unwrap_or_else(|| Local::now().date_naive());
        DateRange::new(self.start_date, end).map_err(CliError::InvalidArgument)
    }
}

impl Cli {
    /// Endpoint configuration from the global options
    pub fn fitbit_config(&self) -> FitbitConfig {
        FitbitConfig {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            api_base_url: self.api_base_url.trim_end_matches('/').to_string(),
            oauth_base_url: self.oauth_base_url.trim_end_matches('/').to_string(),
            scope: OAUTH_SCOPE.to_string(),
        }
    }

    /// The export job described by the command line
    pub fn job(&self) -> Result<ExportJob, CliError> {
        let (kind, args) = self.command.job_parts();
        Ok(ExportJob::new(
            kind,
            args.range()?,
            args.cache_directory.clone(),
            args.directory.clone(),
        ))
    }

    /// Run the selected export
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<ExportSummary, CliError> {
        // Validate before anything touches the network or the filesystem
        let job = self.job()?;

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr).map_err(CliError::ConfigurationError)?;
        }

        let rate_limiter = Arc::new(RateLimiter::new(
            self.rate_limit,
            Duration::from_secs(self.rate_interval_secs),
        ));
        let executor = ExportExecutor::from_config(Arc::new(self.fitbit_config()), rate_limiter)?
            .with_retry_policy(RetryPolicy::fixed(Duration::from_secs(self.retry_delay_secs)))
            .with_shutdown(shutdown);

        info!(
            kind = %job.kind,
            range = %job.range,
            cache_dir = %job.cache_dir.display(),
            output_dir = %job.output_dir.display(),
            "Starting export"
        );
        Ok(executor.execute(&job).await?)
    }
}
