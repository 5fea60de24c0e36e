//! Export orchestration and rate limiting
//!
//! The downloader drives the complete export workflow:
//!
//! 1. **Job creation**: describe what to export with [`ExportJob`]
//! 2. **Execution**: split the job into [`FetchUnit`]s and process them with
//!    [`ExportExecutor`]
//! 3. **Authorization and retry**: every request goes through an
//!    [`AuthenticatedCaller`]
//! 4. **Rate limiting**: one shared [`RateLimiter`] throttles all requests
//! 5. **Resume**: completed units are recorded as done-markers and skipped
//!    on the next run
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use fitbit_export::downloader::{ExportExecutor, ExportJob, ExportKind, RateLimiter};
//! use fitbit_export::fetcher::FitbitConfig;
//! use fitbit_export::DateRange;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
//! )?;
//! let job = ExportJob::new(ExportKind::Weight, range, ".cache".into(), "f2g".into());
//!
//! let executor = ExportExecutor::from_config(
//!     Arc::new(FitbitConfig::default()),
//!     Arc::new(RateLimiter::fitbit()),
//! )?;
//! let summary = executor.execute(&job).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Transient failures never surface: the caller retries them. What does
//! surface is fatal ([`ExportError::Auth`], [`ExportError::Fetch`] for
//! invalid requests, local [`ExportError::Output`] / [`ExportError::Resume`]
//! failures) or a shutdown ([`ExportError::Interrupted`]).

pub mod caller;
pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;

pub use caller::AuthenticatedCaller;
pub use config::RetryPolicy;
pub use executor::ExportExecutor;
pub use job::{ExportJob, ExportKind, ExportSummary, FetchUnit};
pub use rate_limit::RateLimiter;

use crate::auth::AuthError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::resume::ResumeError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Authorization could not be completed
    #[error("authorization error: {0}")]
    Auth(#[from] AuthError),

    /// Request that retrying cannot fix
    #[error("fetcher error: {0}")]
    Fetch(#[from] FetcherError),

    /// Artifact could not be written
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Marker, lock or activity list cache failure
    #[error("resume error: {0}")]
    Resume(#[from] ResumeError),

    /// Shutdown was requested; completed units stay recorded
    #[error("export interrupted by shutdown request")]
    Interrupted,
}
