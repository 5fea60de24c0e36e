//! PKCE verifier and challenge derivation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use fitbit_export::auth::{generate_state, PkceChallenge};
use sha2::{Digest, Sha256};

#[test]
fn test_challenge_is_s256_of_verifier() {
    let pkce = PkceChallenge::generate();
    let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(pkce.verifier.as_bytes()));
    assert_eq!(pkce.challenge, expected);
    assert!(!pkce.challenge.contains('='));
}

#[test]
fn test_verifier_has_allowed_length_and_alphabet() {
    let pkce = PkceChallenge::generate();
    assert!((43..=128).contains(&pkce.verifier.len()));
    assert!(pkce
        .verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn test_each_attempt_gets_fresh_values() {
    assert_ne!(PkceChallenge::generate().verifier, PkceChallenge::generate().verifier);
    let state = generate_state();
    assert_eq!(state.len(), 64);
    assert_ne!(state, generate_state());
}
