//! Credential record and its single-file persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::downloader::config::AUTH_FILE_NAME;
use crate::output::write_atomic;

/// Credential store errors
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    /// Reading or writing the credential file failed
    #[error("credential file {path}: {source}")]
    Io {
        /// Credential file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The credential file exists but is not a valid credential
    #[error("malformed credential file {path}: {source}")]
    Malformed {
        /// Credential file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// OAuth2 credential as returned by the token endpoint, plus the local
/// issuance timestamp `ts`
///
/// Replaced wholesale on refresh; never mutated in place.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API calls
    pub access_token: String,
    /// Token exchanged for a new credential once this one is stale
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds
    pub expires_in: u64,
    /// Usually `Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Provider user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Epoch seconds at which this credential was issued or refreshed
    #[serde(default)]
    pub ts: f64,
    /// Any other provider fields, passed through verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    /// Return this credential with `ts` set to `now`
    pub fn stamp(self, now: DateTime<Utc>) -> Self {
        Self {
            ts: epoch_seconds(now),
            ..self
        }
    }

    /// Epoch seconds at which the access token expires
    pub fn expires_at(&self) -> f64 {
        self.ts + self.expires_in as f64
    }

    /// Stale once `now` is strictly past `ts + expires_in`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        epoch_seconds(now) > self.expires_at()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("user_id", &self.user_id)
            .field("ts", &self.ts)
            .finish_non_exhaustive()
    }
}

fn epoch_seconds(now: DateTime<Utc>) -> f64 {
    now.timestamp_millis() as f64 / 1000.0
}

/// Loads and saves the single credential file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `<cache_dir>/.auth`
    pub fn in_cache_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(AUTH_FILE_NAME))
    }

    /// Credential file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential, `None` if the file does not exist
    pub fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(TokenStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let credential = serde_json::from_slice(&bytes).map_err(|source| TokenStoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(credential))
    }

    /// Atomically replace the stored credential
    pub fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        let mut json = serde_json::to_vec(credential).map_err(|source| TokenStoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        json.push(b'\n');

        write_atomic(&self.path, &json).map_err(|source| TokenStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }
}
