//! Loopback listener capturing the OAuth redirect
//!
//! Binds the redirect URI's host and port, serves exactly its path, and
//! resolves once with the `code` query parameter. The listener is torn down
//! after the code arrives, on [`CallbackServer::shutdown`], or when the
//! server is dropped, whichever comes first.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::AuthError;

/// How long a graceful shutdown may take before the server task is aborted
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

struct CallbackState {
    expected_state: String,
    code_tx: Mutex<Option<oneshot::Sender<String>>>,
}

/// Running redirect listener
pub struct CallbackServer {
    local_addr: SocketAddr,
    path: String,
    code_rx: Option<oneshot::Receiver<String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Start listening on `redirect_uri`, accepting only callbacks whose
    /// `state` equals `expected_state`
    ///
    /// The URI must be plain `http` with an explicit host. Port `0` binds an
    /// ephemeral port (see [`local_addr`](Self::local_addr)).
    pub async fn bind(redirect_uri: &str, expected_state: impl Into<String>) -> Result<Self, AuthError> {
        let invalid = |reason: &str| AuthError::InvalidRedirectUri {
            uri: redirect_uri.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(redirect_uri).map_err(|e| invalid(&e.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(invalid("only http redirect URIs can be served locally"));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;
        let path = match parsed.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        let addr = resolve(&host, port).await.map_err(|source| AuthError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })?;
        let listener = TcpListener::bind(addr).await.map_err(|source| AuthError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| AuthError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(CallbackState {
            expected_state: expected_state.into(),
            code_tx: Mutex::new(Some(code_tx)),
        });

        let app = Router::new()
            .route(&path, get(handle_redirect))
            .with_state(state);

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!("Redirect listener error: {e}");
            }
            debug!("Redirect listener stopped");
        });

        info!(addr = %local_addr, path = %path, "Redirect listener started");
        Ok(Self {
            local_addr,
            path,
            code_rx: Some(code_rx),
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Path the listener serves
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the redirect carrying the authorization code, then stop
    /// listening
    ///
    /// Requests without a code, or with the wrong state, are answered with
    /// an error page and do not resolve this future.
    pub async fn wait_for_code(&mut self) -> Result<String, AuthError> {
        let code_rx = self.code_rx.take().ok_or(AuthError::ListenerClosed)?;
        let result = code_rx.await.map_err(|_| AuthError::ListenerClosed);
        self.shutdown().await;
        result
    }

    /// Stop accepting connections and wait for the server task to finish
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Redirect listener did not stop in time, aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
    // Browsers resolving `localhost` try IPv4 first
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("{host} did not resolve to any address"),
            )
        })
}

async fn handle_redirect(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(code) = params.get("code").filter(|code| !code.is_empty()) else {
        debug!("Redirect without authorization code");
        return (StatusCode::NOT_FOUND, "Authorization code not found.");
    };

    if params.get("state") != Some(&state.expected_state) {
        warn!("Redirect with mismatched state parameter ignored");
        return (StatusCode::BAD_REQUEST, "State mismatch.");
    }

    let sender = state
        .code_tx
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match sender {
        Some(sender) => {
            let _ = sender.send(code.clone());
            (StatusCode::OK, "Success! You can close this window.")
        }
        None => (StatusCode::OK, "Already authorized. You can close this window."),
    }
}
