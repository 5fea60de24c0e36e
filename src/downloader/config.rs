//! Export configuration constants

use std::time::Duration;

/// Requests the provider allows per [`API_RATE_INTERVAL`].
/// The budget is per user, so one limiter instance covers the whole process.
pub const API_RATE_LIMIT: usize = 150;

/// Length of the provider's rate-limit window (one hour).
pub const API_RATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Longest single sleep inside [`RateLimiter::acquire`](super::RateLimiter::acquire)
/// before the window is re-checked.
pub const RATE_LIMIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default pause between retry attempts of one fetch unit.
///
/// Zero: the provider-side budget already throttles request volume, so a
/// failed unit is retried immediately and forever.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::ZERO;

/// Name of the credential file inside the cache directory.
pub const AUTH_FILE_NAME: &str = ".auth";

/// Name of the advisory lock file inside the cache directory.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Default cache directory for markers, credentials and the activity list.
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Default output directory for exported artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "f2g";

/// A TCX payload with this many newlines or fewer carries no samples.
pub const EMPTY_TCX_MAX_NEWLINES: usize = 15;

/// Retry policy between attempts of one fetch unit
///
/// There is deliberately no attempt cap: only fatal errors or a shutdown
/// request end the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    /// Retry immediately after each failure
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    /// Pause for `delay` between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pause applied before the next attempt
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}
