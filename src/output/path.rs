//! Cache and output directory layout
//!
//! # Architecture
//!
//! - [`ExportPaths`] - The two directories an export works in, and the fixed
//!   files inside the cache directory
//! - [`split_into_month_ranges`] - Splits a date range into calendar-month chunks
//!
//! Per-unit file names come from [`FetchUnit`](crate::downloader::FetchUnit);
//! this module only joins them onto the right directory.

use super::{OutputError, OutputResult};
use crate::downloader::config::{AUTH_FILE_NAME, LOCK_FILE_NAME};
use crate::DateRange;
use chrono::{Datelike, Months, NaiveDate};
use std::path::{Path, PathBuf};

/// Cache and output directories of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    cache_dir: PathBuf,
    output_dir: PathBuf,
}

impl ExportPaths {
    /// Create paths rooted at `cache_dir` and `output_dir`
    pub fn new(cache_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Directory holding credentials, markers and the activity list
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory receiving exported artifacts
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if they do not exist yet
    pub fn ensure_directories(&self) -> OutputResult<()> {
        for dir in [&self.cache_dir, &self.output_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                OutputError::IoError(format!("Failed to create directory {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// Persisted OAuth credential
    pub fn auth_file(&self) -> PathBuf {
        self.cache_dir.join(AUTH_FILE_NAME)
    }

    /// Advisory lock guarding the cache directory
    pub fn lock_file(&self) -> PathBuf {
        self.cache_dir.join(LOCK_FILE_NAME)
    }

    /// File named `name` inside the cache directory
    pub fn cache_file(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// File named `name` inside the output directory
    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

/// Split `range` into calendar-month chunks
///
/// The first chunk starts at `range.start()`; every later chunk starts on the
/// 1st. Each chunk ends at its month's last day or at `range.end()`,
/// whichever is earlier.
pub fn split_into_month_ranges(range: &DateRange) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut current_start = range.start();

    loop {
        let next_month_start = first_of_next_month(current_start);
        let month_end = next_month_start
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        let chunk_end = month_end.min(range.end());

        // current_start <= chunk_end holds on every iteration
        ranges.extend(DateRange::new(current_start, chunk_end).ok());

        match next_month_start {
            Some(next) if chunk_end < range.end() => current_start = next,
            _ => break,
        }
    }

    ranges
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.checked_add_months(Months::new(1))
}
