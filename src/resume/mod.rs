//! Resume capability via done-markers
//!
//! A fetch unit is complete exactly when its marker exists. Markers are
//! written only after the unit's artifacts are durably on disk, so an
//! interrupted export restarts at the first unit without a marker.

pub mod activity_log;
pub mod lock;
pub mod marker;

pub use activity_log::ActivityLogCache;
pub use lock::CacheLock;
pub use marker::{CompletionStore, FsMarkerStore, UnitStatus};

/// Resume state errors
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Lock acquisition error
    #[error("lock error: {0}")]
    LockError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}
