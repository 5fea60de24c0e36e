//! Done-marker lookup
//!
//! [`CompletionStore`] answers "is this unit complete?" and records
//! completion. [`FsMarkerStore`] keeps one zero-byte file per completed unit
//! in the cache directory, named by [`FetchUnit::cache_key`].

use std::path::{Path, PathBuf};
use tracing::debug;

use super::ResumeError;
use crate::downloader::FetchUnit;
use crate::output::write_atomic;

/// Completion state of one fetch unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// Marker present; the unit's artifacts are complete
    Completed,
    /// Not yet done
    Pending,
}

/// Persistent record of completed fetch units
pub trait CompletionStore: Send + Sync {
    /// Look up `unit`
    fn status(&self, unit: &FetchUnit) -> Result<UnitStatus, ResumeError>;

    /// Record `unit` as complete
    ///
    /// Callers must only do this after every artifact of the unit is written.
    fn mark_completed(&self, unit: &FetchUnit) -> Result<(), ResumeError>;
}

/// [`CompletionStore`] backed by marker files
#[derive(Debug, Clone)]
pub struct FsMarkerStore {
    cache_dir: PathBuf,
}

impl FsMarkerStore {
    /// Store keeping markers in `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Directory holding the markers
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Marker file of `unit`
    pub fn marker_path(&self, unit: &FetchUnit) -> PathBuf {
        self.cache_dir.join(unit.cache_key())
    }
}

impl CompletionStore for FsMarkerStore {
    fn status(&self, unit: &FetchUnit) -> Result<UnitStatus, ResumeError> {
        let path = self.marker_path(unit);
        let exists = path.try_exists().map_err(|e| {
            ResumeError::IoError(format!("Failed to check marker {}: {e}", path.display()))
        })?;
        Ok(if exists {
            UnitStatus::Completed
        } else {
            UnitStatus::Pending
        })
    }

    fn mark_completed(&self, unit: &FetchUnit) -> Result<(), ResumeError> {
        let path = self.marker_path(unit);
        write_atomic(&path, &[]).map_err(|e| {
            ResumeError::IoError(format!("Failed to write marker {}: {e}", path.display()))
        })?;
        debug!(marker = %path.display(), "Unit marked completed");
        Ok(())
    }
}
