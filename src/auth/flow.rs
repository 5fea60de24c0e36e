//! OAuth2 authorization-code flow with PKCE, and token refresh

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::callback_server::CallbackServer;
use super::pkce::{generate_state, PkceChallenge};
use super::token_store::Credential;
use super::AuthError;
use crate::fetcher::{FetcherError, FitbitConfig, FitbitHttpClient};

/// Surfaces the authorization URL to the user
///
/// This is the only interactive step of the whole export.
pub trait AuthorizationPrompt: Send + Sync {
    /// Ask the user to open `url` and log in
    fn present(&self, url: &Url);
}

/// Prints the authorization URL to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPrompt;

impl AuthorizationPrompt for StdoutPrompt {
    fn present(&self, url: &Url) {
        println!("Login with your Fitbit account using: {url}");
    }
}

/// Outcome of [`OAuthFlow::ensure_fresh`]
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialUpdate {
    /// The credential passed in was fresh and is returned as is
    Unchanged(Credential),
    /// A new credential was issued and must be persisted
    Issued(Credential),
}

impl CredentialUpdate {
    /// The credential to use
    pub fn credential(&self) -> &Credential {
        match self {
            Self::Unchanged(c) | Self::Issued(c) => c,
        }
    }

    /// Take the credential out
    pub fn into_credential(self) -> Credential {
        match self {
            Self::Unchanged(c) | Self::Issued(c) => c,
        }
    }

    /// Whether a new credential was issued
    pub fn is_issued(&self) -> bool {
        matches!(self, Self::Issued(_))
    }
}

/// OAuth2 PKCE flow against the Fitbit authorization server
#[derive(Clone)]
pub struct OAuthFlow {
    http: FitbitHttpClient,
    config: Arc<FitbitConfig>,
    prompt: Arc<dyn AuthorizationPrompt>,
}

impl std::fmt::Debug for OAuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthFlow")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OAuthFlow {
    /// Flow that prints the authorization URL to stdout
    pub fn new(http: FitbitHttpClient, config: Arc<FitbitConfig>) -> Self {
        Self {
            http,
            config,
            prompt: Arc::new(StdoutPrompt),
        }
    }

    /// Replace the way the authorization URL reaches the user
    pub fn with_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Browser URL for one authorization attempt
    pub fn authorization_url(&self, state: &str, pkce: &PkceChallenge) -> Result<Url, AuthError> {
        self.config
            .authorization_url(state, &pkce.challenge)
            .map_err(|e| AuthError::InvalidRedirectUri {
                uri: self.config.oauth_base_url.clone(),
                reason: e.to_string(),
            })
    }

    /// Run the full authorization-code flow
    ///
    /// Starts the redirect listener, presents the authorization URL, waits
    /// for the code and exchanges it for a freshly stamped credential.
    pub async fn authorize(&self) -> Result<Credential, AuthError> {
        let pkce = PkceChallenge::generate();
        let state = generate_state();

        let code = {
            let mut server = CallbackServer::bind(&self.config.redirect_uri, state.clone()).await?;
            let url = self.authorization_url(&state, &pkce)?;
            self.prompt.present(&url);
            server.wait_for_code().await?
        };
        info!("Login successful");

        let credential: Credential = self
            .http
            .post_form(
                "oauth_token",
                &self.config.token_url(),
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("redirect_uri", self.config.redirect_uri.as_str()),
                    ("state", state.as_str()),
                    ("code", code.as_str()),
                    ("code_verifier", pkce.verifier.as_str()),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        debug!(user_id = ?credential.user_id, "Authorization code exchanged");
        Ok(credential.stamp(Utc::now()))
    }

    /// Exchange `credential`'s refresh token for a new credential
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refreshed: Credential = self
            .http
            .post_form(
                "oauth_token",
                &self.config.token_url(),
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("refresh_token", credential.refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        debug!("Access token refreshed");
        Ok(refreshed.stamp(Utc::now()))
    }

    /// Return a fresh credential, authorizing or refreshing as needed
    ///
    /// A refresh token the provider rejects (HTTP 400/401) falls back to a
    /// new authorization.
    pub async fn ensure_fresh(&self, current: Option<Credential>) -> Result<CredentialUpdate, AuthError> {
        let Some(credential) = current else {
            info!("No stored credential, starting authorization");
            return self.authorize().await.map(CredentialUpdate::Issued);
        };

        if !credential.is_stale_at(Utc::now()) {
            return Ok(CredentialUpdate::Unchanged(credential));
        }

        info!("Access token expired, refreshing");
        self.refresh_or_authorize(&credential)
            .await
            .map(CredentialUpdate::Issued)
    }

    /// Refresh unconditionally, e.g. after the provider rejected an
    /// unexpired access token
    pub async fn refresh_or_authorize(&self, credential: &Credential) -> Result<Credential, AuthError> {
        match self.refresh(credential).await {
            Err(AuthError::TokenRequest(FetcherError::HttpStatus { status, body }))
                if status == 400 || status == 401 =>
            {
                warn!(status, body = %body, "Refresh token rejected, re-authorizing");
                self.authorize().await
            }
            other => other,
        }
    }
}
