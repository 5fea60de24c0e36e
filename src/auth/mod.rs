//! OAuth2 PKCE authorization and credential persistence
//!
//! The flow is a small state machine driven lazily by its callers:
//!
//! - no credential: run the authorization-code flow through a loopback
//!   [`CallbackServer`] and exchange the code for a [`Credential`]
//! - stale credential: exchange the refresh token for a new one
//! - fresh credential: use it as is
//!
//! Nothing here retries; see [`AuthenticatedCaller`](crate::downloader::AuthenticatedCaller).

pub mod callback_server;
pub mod flow;
pub mod pkce;
pub mod token_store;

pub use callback_server::CallbackServer;
pub use flow::{AuthorizationPrompt, CredentialUpdate, OAuthFlow, StdoutPrompt};
pub use pkce::{generate_state, PkceChallenge};
pub use token_store::{Credential, TokenStore, TokenStoreError};

use crate::fetcher::FetcherError;

/// Authorization errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Redirect URI cannot be served by a local listener
    #[error("invalid redirect URI {uri}: {reason}")]
    InvalidRedirectUri {
        /// Configured redirect URI
        uri: String,
        /// What is wrong with it
        reason: String,
    },

    /// Redirect listener could not bind its address
    #[error("failed to bind redirect listener on {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Listener stopped before any request carried an authorization code
    #[error("redirect listener closed before an authorization code arrived")]
    ListenerClosed,

    /// Token exchange or refresh request failed
    #[error("token request failed: {0}")]
    TokenRequest(#[from] FetcherError),

    /// Credential file could not be read or written
    #[error(transparent)]
    Store(#[from] TokenStoreError),
}

impl AuthError {
    /// Whether retrying the authorization cycle cannot help
    ///
    /// Local configuration and filesystem problems are fatal; network and
    /// provider failures are not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidRedirectUri { .. } | Self::Bind { .. } | Self::Store(_) => true,
            Self::TokenRequest(e) => !e.is_transient(),
            Self::ListenerClosed => false,
        }
    }
}
