//! Retry message formatting for the authenticated retry loop.
//!
//! Failed attempts are classified into a [`RetryErrorType`] so every retry
//! log line carries the same short description and remediation hint.

use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Network timeout or connection stalled long enough to trigger a timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// Other client errors (4xx, except 429)
    ClientError(u16),
    /// Response arrived but its body could not be decoded
    InvalidBody,
    /// Authorization flow failed before the request was sent
    Authorization,
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "request timed out",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(code) => match code {
                401 => "access token rejected (401)",
                403 => "access denied (403)",
                _ => "authentication failed",
            },
            Self::ClientError(code) => match code {
                404 => "resource not found",
                _ => "client error",
            },
            Self::InvalidBody => "invalid response body",
            Self::Authorization => "authorization failed",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown next to the retry message.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Another client may share this account's hourly budget",
            Self::ServerError(_) => "Fitbit may be experiencing issues; retrying",
            Self::AuthFailed(_) => "The token will be refreshed; re-authorize if this persists",
            Self::ClientError(_) => "Check the requested date range",
            Self::InvalidBody => "Fitbit returned an unexpected payload; retrying",
            Self::Authorization => "Complete the login in your browser",
            Self::NetworkGeneric => "Check network connectivity",
        }
    }
}

/// Context for formatting one retry message.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Label of the call being retried (e.g. `[2/5] weight-2023-02-01:2023-02-28`)
    pub label: String,
    /// Attempt that just failed (1-based)
    pub attempt: u64,
    /// Classification of the failure
    pub error_type: RetryErrorType,
    /// Pause before the next attempt
    pub delay: Duration,
    /// Original error message
    pub error_message: String,
}

impl RetryContext {
    /// Format the standardized retry message.
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "{}: Request failed (attempt {}, {}): {}",
            self.label,
            self.attempt,
            self.error_type.description(),
            self.error_message
        );
        if self.delay.is_zero() {
            message.push_str(" - retrying now");
        } else {
            message.push_str(&format!(
                " - retrying in {:.1} seconds",
                self.delay.as_secs_f64()
            ));
        }
        message
    }
}

/// Extract a [`RetryErrorType`] from an HTTP status or reqwest error.
pub fn extract_error_type(
    status: Option<StatusCode>,
    err: Option<&ReqwestError>,
) -> RetryErrorType {
    if let Some(status) = status {
        match status.as_u16() {
            401 | 403 => return RetryErrorType::AuthFailed(status.as_u16()),
            429 => return RetryErrorType::RateLimit,
            _ => {}
        }

        if status.is_server_error() {
            return RetryErrorType::ServerError(status.as_u16());
        }

        if status.is_client_error() {
            return RetryErrorType::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }

        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }

        if err.is_decode() {
            return RetryErrorType::InvalidBody;
        }
    }

    RetryErrorType::NetworkGeneric
}
