//! Observability metrics for the exporter
//!
//! Counters and histograms for outbound requests, retries, rate-limiter
//! queueing and export unit outcomes.
//!
//! ## Architecture
//!
//! - Uses the `metrics` facade; calls are no-ops until a recorder is installed
//! - [`init_metrics`] installs the Prometheus exporter when a scrape address is configured

use metrics::{counter, describe_counter, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

static CORRELATION_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));

/// Install the Prometheus exporter on `addr`
///
/// Idempotent: later calls are ignored.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the Fitbit API"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "fetch_retries_total",
        Unit::Count,
        "Total number of retried fetch attempts"
    );
    describe_histogram!(
        "rate_limit_queue_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a rate limiter slot"
    );
    describe_counter!(
        "export_units_total",
        Unit::Count,
        "Export units processed, by kind and outcome"
    );

    Ok(())
}

/// Whether the Prometheus exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.load(Ordering::SeqCst)
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP request
pub struct HttpRequestMetrics {
    endpoint: &'static str,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start recording a request against `endpoint`
    pub fn start(endpoint: &'static str) -> Self {
        let correlation_id = generate_correlation_id();
        debug!(correlation_id = %correlation_id, endpoint, "Sending request");
        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint,
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!("http_request_duration_seconds", "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                correlation_id = %self.correlation_id,
                endpoint = self.endpoint,
                "Provider rate limit (429) hit despite local limiter"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "Request completed"
        );
    }

    /// Record a request that never produced a status code
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint,
            "status" => "network_error",
        )
        .increment(1);
        histogram!("http_request_duration_seconds", "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            duration_ms = duration.as_millis() as u64,
            "Request failed without response"
        );
    }

    /// Correlation ID attached to this request's log lines
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record that the unit identified by `label` is being retried
pub fn record_retry(label: &str, attempt: u64) {
    counter!("fetch_retries_total").increment(1);
    debug!(label, attempt, "Retry recorded");
}

/// Rate limiter queueing metrics
pub struct RateLimiterMetrics {
    start_time: Option<Instant>,
}

impl Default for RateLimiterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterMetrics {
    /// Create a new rate limiter metrics instance
    pub fn new() -> Self {
        Self { start_time: None }
    }

    /// Start measuring queue wait time
    pub fn start_acquire(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Record a granted slot and the number of slots still free
    pub fn record_acquired(&mut self, available: usize) {
        if let Some(start) = self.start_time.take() {
            let wait = start.elapsed();
            histogram!("rate_limit_queue_wait_seconds").record(wait.as_secs_f64());
            gauge!("rate_limit_slots_available").set(available as f64);

            if wait.as_millis() > 100 {
                debug!(
                    wait_ms = wait.as_millis() as u64,
                    available, "Rate limit slot acquired after wait"
                );
            }
        }
    }
}

/// Outcome of one export unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Done-marker already present
    Skipped,
    /// Fetched and an artifact written
    Fetched,
    /// Fetched (or known) to be empty; marked done without artifact
    Empty,
}

impl UnitOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Fetched => "fetched",
            Self::Empty => "empty",
        }
    }
}

/// Per-export metrics
pub struct ExportMetrics {
    kind: &'static str,
    start_time: Instant,
}

impl ExportMetrics {
    /// Start tracking an export of `kind`
    pub fn start(kind: &'static str) -> Self {
        info!(kind, "Export started");
        Self {
            kind,
            start_time: Instant::now(),
        }
    }

    /// Count one processed unit
    pub fn record_unit(&self, outcome: UnitOutcome) {
        counter!(
            "export_units_total",
            "kind" => self.kind,
            "outcome" => outcome.as_str(),
        )
        .increment(1);
    }

    /// Log completion of the export
    pub fn record_success(&self, units: usize) {
        info!(
            kind = self.kind,
            units,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export completed"
        );
    }
}
