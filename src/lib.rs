//! # Fitbit Export Library
//!
//! Exports a user's Fitbit history (exercise activities, daily activity
//! metrics and body weight) into local files so it can be imported elsewhere.
//!
//! ## Features
//!
//! - **OAuth2 PKCE**: Authorization-code flow with a loopback redirect listener
//!   and lazy token refresh
//! - **Rate Limiting**: One shared sliding-window limiter in front of every request
//! - **Resume Capability**: Per-unit done-markers make every export idempotent
//!   and resumable across process restarts
//! - **Retry Forever**: Transient failures are retried until they succeed
//!
//! ## Quick Start
//!
//! ```no_run
//! use fitbit_export::downloader::{ExportExecutor, ExportJob, ExportKind, RateLimiter};
//! use fitbit_export::fetcher::FitbitConfig;
//! use fitbit_export::DateRange;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(FitbitConfig::default());
//! let limiter = Arc::new(RateLimiter::new(150, std::time::Duration::from_secs(3600)));
//! let executor = ExportExecutor::from_config(config, limiter)?;
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
//! )?;
//! let job = ExportJob::new(ExportKind::Weight, range, ".cache".into(), "f2g".into());
//! let summary = executor.execute(&job).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`downloader`] - Rate limiter, authenticated retry loop and export orchestration
//! - [`auth`] - OAuth2 PKCE flow, redirect listener and credential persistence
//! - [`fetcher`] - Typed, rate-limited wrappers around the Fitbit Web API
//! - [`resume`] - Done-markers, cache lock and the cached activity list
//! - [`output`] - CSV/TCX artifact writers and file naming
//! - [`cli`] - Command-line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth2 authorization and credential persistence
pub mod auth;

/// CLI command implementations
pub mod cli;

/// Export orchestration, retry and rate limiting
pub mod downloader;

/// Fitbit Web API client
pub mod fetcher;

/// Metrics collection
pub mod metrics;

/// Output artifact writers
pub mod output;

/// Resume capability via done-markers
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Log type the provider assigns to automatically recognized exercises.
///
/// These never carry GPS/heart-rate samples, so their TCX is always empty.
pub const AUTO_DETECTED_LOG_TYPE: &str = "auto_detected";

/// Inclusive calendar date range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("start date {start} is after end date {end}"));
        }
        Ok(Self { start, end })
    }

    /// First day of the range
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// One exercise from the activity log list
///
/// Only the fields the export needs are typed; the full provider object is
/// kept verbatim in the cached activity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    /// Provider log identifier
    pub log_id: u64,
    /// How the activity was recorded (`manual`, `tracker`, `auto_detected`, ...)
    pub log_type: String,
    /// Start time in the user's local offset
    pub original_start_time: DateTime<FixedOffset>,
    /// Remaining provider fields, carried through to the cached activity list
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ActivityLogEntry {
    /// Local calendar date the activity started on
    pub fn start_date(&self) -> NaiveDate {
        self.original_start_time.date_naive()
    }

    /// Whether the provider recognized this activity automatically
    pub fn is_auto_detected(&self) -> bool {
        self.log_type == AUTO_DETECTED_LOG_TYPE
    }
}

/// One body weight log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    /// Day of the measurement
    pub date: NaiveDate,
    /// Weight in the account's unit system
    pub weight: Decimal,
    /// Body mass index
    pub bmi: Decimal,
    /// Body fat percentage, when the scale reported one
    pub fat: Option<Decimal>,
}

/// Daily activity metrics merged from the per-resource time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetricsDay {
    /// Day the metrics belong to
    pub date: NaiveDate,
    /// Total calories burned
    pub calories: Decimal,
    /// Step count
    pub steps: Decimal,
    /// Distance travelled
    pub distance: Decimal,
    /// Floors climbed
    pub floors: Decimal,
    /// Sedentary minutes
    pub minutes_sedentary: Decimal,
    /// Lightly active minutes
    pub minutes_lightly_active: Decimal,
    /// Fairly active minutes
    pub minutes_fairly_active: Decimal,
    /// Very active minutes
    pub minutes_very_active: Decimal,
    /// Calories burned through activity
    pub activity_calories: Decimal,
}

impl ActivityMetricsDay {
    /// Days without a single step are not worth exporting
    pub fn has_steps(&self) -> bool {
        self.steps > Decimal::ZERO
    }
}
