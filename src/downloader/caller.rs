//! Authenticated, retrying call wrapper
//!
//! Every request the export makes goes through [`AuthenticatedCaller::call`],
//! which keeps the stored credential fresh and retries the whole
//! authorize-and-request cycle until it succeeds. Only fatal errors and a
//! shutdown request end the loop early.

use std::future::Future;
use tracing::{debug, warn};

use super::config::RetryPolicy;
use super::ExportError;
use crate::auth::{AuthError, CredentialUpdate, OAuthFlow, TokenStore};
use crate::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::record_retry;
use crate::shutdown::SharedShutdown;

/// Failure of one authorize-and-request attempt
#[derive(Debug)]
enum AttemptError {
    Auth(AuthError),
    Fetch(FetcherError),
}

impl AttemptError {
    fn is_fatal(&self) -> bool {
        match self {
            Self::Auth(e) => e.is_fatal(),
            Self::Fetch(e) => !e.is_transient(),
        }
    }

    fn error_type(&self) -> RetryErrorType {
        match self {
            Self::Auth(AuthError::TokenRequest(e)) | Self::Fetch(e) => e.error_type(),
            Self::Auth(_) => RetryErrorType::Authorization,
        }
    }

    fn into_export_error(self) -> ExportError {
        match self {
            Self::Auth(e) => ExportError::Auth(e),
            Self::Fetch(e) => ExportError::Fetch(e),
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(e) => write!(f, "{e}"),
            Self::Fetch(e) => write!(f, "{e}"),
        }
    }
}

/// Runs requests with a fresh bearer token, retrying forever
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    flow: OAuthFlow,
    store: TokenStore,
    retry_policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
}

impl AuthenticatedCaller {
    /// Caller reading and persisting credentials through `store`
    pub fn new(flow: OAuthFlow, store: TokenStore) -> Self {
        Self {
            flow,
            store,
            retry_policy: RetryPolicy::default(),
            shutdown: None,
        }
    }

    /// Pause between attempts
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Stop retrying once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Call `op` with a valid access token until it succeeds
    ///
    /// Each attempt reloads the credential file, authorizes or refreshes as
    /// needed (persisting any new credential before `op` runs), then invokes
    /// `op`. A 401 from `op` forces a refresh on the next attempt even if the
    /// stored credential looks unexpired.
    ///
    /// # Errors
    ///
    /// Returns early only for fatal errors (unusable redirect URI, listener
    /// bind failure, unreadable credential file, invalid request) or
    /// [`ExportError::Interrupted`] when shutdown is requested.
    pub async fn call<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ExportError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        let mut attempt: u64 = 0;
        let mut force_refresh = false;

        loop {
            attempt += 1;
            self.check_shutdown()?;

            let outcome = self
                .until_shutdown(self.attempt(label, &mut op, force_refresh))
                .await
                .ok_or(ExportError::Interrupted)?;

            let error = match outcome {
                Ok(value) => {
                    debug!("{label}: Done.");
                    return Ok(value);
                }
                Err(error) if error.is_fatal() => return Err(error.into_export_error()),
                Err(error) => error,
            };

            force_refresh = matches!(&error, AttemptError::Fetch(e) if e.is_unauthorized());

            let delay = self.retry_policy.delay();
            let context = RetryContext {
                label: label.to_string(),
                attempt,
                error_type: error.error_type(),
                delay,
                error_message: error.to_string(),
            };
            warn!("{}", context.format_retry());
            record_retry(label, attempt);

            if !delay.is_zero() {
                self.until_shutdown(tokio::time::sleep(delay))
                    .await
                    .ok_or(ExportError::Interrupted)?;
            }
        }
    }

    async fn attempt<T, F, Fut>(
        &self,
        label: &str,
        op: &mut F,
        force_refresh: bool,
    ) -> Result<T, AttemptError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        debug!("{label}: Authorizing request.");
        let stored = self
            .store
            .load()
            .map_err(|e| AttemptError::Auth(AuthError::Store(e)))?;

        let update = match stored {
            Some(credential) if force_refresh => {
                debug!("{label}: Access token rejected, refreshing.");
                self.flow
                    .refresh_or_authorize(&credential)
                    .await
                    .map(CredentialUpdate::Issued)
            }
            stored => self.flow.ensure_fresh(stored).await,
        }
        .map_err(AttemptError::Auth)?;

        if update.is_issued() {
            self.store
                .save(update.credential())
                .map_err(|e| AttemptError::Auth(AuthError::Store(e)))?;
        }

        debug!("{label}: Sending request.");
        let token = update.into_credential().access_token;
        op(token).await.map_err(AttemptError::Fetch)
    }

    fn check_shutdown(&self) -> Result<(), ExportError> {
        match &self.shutdown {
            Some(shutdown) if shutdown.is_shutdown_requested() => Err(ExportError::Interrupted),
            _ => Ok(()),
        }
    }

    async fn until_shutdown<Fut: Future>(&self, fut: Fut) -> Option<Fut::Output> {
        match &self.shutdown {
            None => Some(fut.await),
            Some(shutdown) => {
                tokio::select! {
                    biased;
                    _ = shutdown.wait_for_shutdown() => None,
                    output = fut => Some(output),
                }
            }
        }
    }
}
