//! Fitbit Web API client
//!
//! Each endpoint wrapper issues rate-limited requests carrying a bearer
//! token and returns typed results. Nothing in this module retries: a
//! failed request surfaces as a [`FetcherError`] and the
//! [`AuthenticatedCaller`](crate::downloader::AuthenticatedCaller) decides
//! what to do with it.

use crate::fetcher::retry_formatter::{extract_error_type, RetryErrorType};

pub mod fitbit_client;
pub mod fitbit_config;
pub mod fitbit_http;
pub mod fitbit_parser;
pub mod pagination;
pub mod retry_formatter;

pub use fitbit_client::FitbitClient;
pub use fitbit_config::FitbitConfig;
pub use fitbit_http::FitbitHttpClient;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-2xx response
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection or transport failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),

    /// Requested window rejected locally before any request was made
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// Failed to build the HTTP client
    #[error("client configuration error: {0}")]
    ClientConfig(String),
}

impl FetcherError {
    /// Whether retrying the same request may succeed
    ///
    /// Every provider-side or transport failure is transient; only local
    /// validation and configuration errors are not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidRange(_) | Self::ClientConfig(_))
    }

    /// Whether the provider rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401, .. })
    }

    /// Classification used in retry log lines
    pub fn error_type(&self) -> RetryErrorType {
        match self {
            Self::HttpStatus { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(|s| extract_error_type(Some(s), None))
                .unwrap_or(RetryErrorType::NetworkGeneric),
            Self::Timeout(_) => RetryErrorType::NetworkTimeout,
            Self::NetworkError(_) => RetryErrorType::NetworkOffline,
            Self::ParseError(_) => RetryErrorType::InvalidBody,
            Self::InvalidRange(_) | Self::ClientConfig(_) => RetryErrorType::NetworkGeneric,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        match extract_error_type(err.status(), Some(&err)) {
            RetryErrorType::NetworkTimeout => Self::Timeout(err.to_string()),
            RetryErrorType::InvalidBody => Self::ParseError(err.to_string()),
            _ => match err.status() {
                Some(status) => Self::HttpStatus {
                    status: status.as_u16(),
                    body: err.to_string(),
                },
                None => Self::NetworkError(err.to_string()),
            },
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
