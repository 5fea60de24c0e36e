//! PKCE verifier/challenge pairs and CSRF state tokens

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind every verifier
pub const VERIFIER_RANDOM_BYTES: usize = 64;

/// PKCE challenge pair for one authorization attempt
///
/// Never persisted; a new pair is generated per attempt.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Secret sent with the token exchange
    pub verifier: String,
    /// `base64url_nopad(SHA-256(verifier))`, sent with the authorization URL
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh pair from 64 random bytes
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_RANDOM_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Derive the S256 challenge for an existing verifier
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Fresh CSRF state token: hex SHA-256 of 64 random bytes
pub fn generate_state() -> String {
    let mut bytes = [0u8; VERIFIER_RANDOM_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
