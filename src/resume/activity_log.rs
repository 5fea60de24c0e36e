//! Cached activity list
//!
//! The activity list of one export range is stored as JSON lines next to
//! its marker, so a restarted export goes straight to the per-activity
//! fetches without listing again.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::ResumeError;
use crate::output::write_atomic;
use crate::{ActivityLogEntry, DateRange};

/// JSON-lines file holding the activity list of one range
#[derive(Debug, Clone)]
pub struct ActivityLogCache {
    path: PathBuf,
}

impl ActivityLogCache {
    /// Cache for `range` inside `cache_dir`: `.exercises.<start>:<end>.jsonl`
    pub fn for_range(cache_dir: &Path, range: &DateRange) -> Self {
        Self {
            path: cache_dir.join(format!(".exercises.{range}.jsonl")),
        }
    }

    /// Cache file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the cache file exists
    pub fn exists(&self) -> Result<bool, ResumeError> {
        self.path
            .try_exists()
            .map_err(|e| ResumeError::IoError(format!("Failed to check {}: {e}", self.path.display())))
    }

    /// Atomically write `activities`, one JSON object per line
    pub fn write(&self, activities: &[ActivityLogEntry]) -> Result<(), ResumeError> {
        let mut buf = Vec::new();
        for activity in activities {
            serde_json::to_writer(&mut buf, activity)
                .map_err(|e| ResumeError::SerializationError(e.to_string()))?;
            buf.push(b'\n');
        }

        write_atomic(&self.path, &buf).map_err(|e| {
            ResumeError::IoError(format!("Failed to write {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), count = activities.len(), "Activity list cached");
        Ok(())
    }

    /// Read the cached activities in their stored order
    pub fn read(&self) -> Result<Vec<ActivityLogEntry>, ResumeError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            ResumeError::IoError(format!("Failed to read {}: {e}", self.path.display()))
        })?;

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    ResumeError::SerializationError(format!(
                        "{} line {}: {e}",
                        self.path.display(),
                        i + 1
                    ))
                })
            })
            .collect()
    }
}
