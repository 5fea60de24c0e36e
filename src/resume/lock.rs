//! Cache directory lock
//!
//! Advisory exclusive lock using fd-lock, held for the duration of an
//! export so two processes never interleave writes into one cache.

use super::ResumeError;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive lock on a cache directory
pub struct CacheLock {
    // Held for its file handle: closing it releases the lock
    _lock: RwLock<File>,
    path: PathBuf,
}

impl CacheLock {
    /// Try to lock `path` without blocking
    ///
    /// Returns an error immediately if another process holds the lock.
    pub fn try_acquire(path: &Path) -> Result<Self, ResumeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResumeError::IoError(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| ResumeError::LockError(format!("Failed to open lock file: {e}")))?;

        let mut lock = RwLock::new(file);
        let guard = lock.try_write().map_err(|e| {
            ResumeError::LockError(format!(
                "Cache directory is in use by another export ({}): {e}",
                path.display()
            ))
        })?;
        // Keep the OS lock past the guard; it is released when `lock` closes the file
        std::mem::forget(guard);

        debug!(path = %path.display(), "Cache lock acquired");
        Ok(Self {
            _lock: lock,
            path: path.to_path_buf(),
        })
    }

    /// Lock file location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for CacheLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLock").field("path", &self.path).finish()
    }
}
