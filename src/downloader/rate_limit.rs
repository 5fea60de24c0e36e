//! Request-based rate limiting
//!
//! Sliding-window limiter: at most `limit` grants may complete inside any
//! window of length `interval`. One instance is constructed at start-up and
//! shared by reference (`Arc`) with every outbound call site.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::downloader::config::{API_RATE_INTERVAL, API_RATE_LIMIT, RATE_LIMIT_POLL_INTERVAL};
use crate::metrics::RateLimiterMetrics;

/// Shared request limiter
#[derive(Debug)]
pub struct RateLimiter {
    limit: Option<usize>,
    interval: Duration,
    poll_interval: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` requests per rolling `interval`
    ///
    /// A `limit` of zero is treated as one so `acquire` can always make progress.
    pub fn new(limit: usize, interval: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            limit: Some(limit),
            interval,
            poll_interval: RATE_LIMIT_POLL_INTERVAL,
            grants: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// The provider's per-user budget: 150 requests per hour
    pub fn fitbit() -> Self {
        Self::new(API_RATE_LIMIT, API_RATE_INTERVAL)
    }

    /// Limiter that never delays; used by tests and local tooling
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            interval: Duration::ZERO,
            poll_interval: RATE_LIMIT_POLL_INTERVAL,
            grants: Mutex::new(VecDeque::new()),
        }
    }

    /// Upper bound on a single wait before the window is re-checked
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Configured budget, `None` when unlimited
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Window length
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a slot is free, then reserve exactly one
    ///
    /// Never fails; only delays.
    pub async fn acquire(&self) {
        let Some(limit) = self.limit else {
            return;
        };

        let mut metrics = RateLimiterMetrics::new();
        metrics.start_acquire();

        loop {
            let wait = {
                // The lock is never held across an await point
                let mut grants = self.grants.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();

                while let Some(oldest) = grants.front() {
                    if now.duration_since(*oldest) >= self.interval {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }

                if grants.len() < limit {
                    grants.push_back(now);
                    metrics.record_acquired(limit - grants.len());
                    return;
                }

                match grants.front() {
                    Some(oldest) => self.interval - now.duration_since(*oldest),
                    None => Duration::ZERO,
                }
            };

            let wait = wait.min(self.poll_interval);
            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting for a free slot");
            sleep(wait).await;
        }
    }
}
