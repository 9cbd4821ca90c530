//! PKCE verifier/challenge generation.
//!
//! Verifiers and state tokens are drawn straight from the operating system's
//! randomness source. If that source cannot be read the attempt fails with
//! `EntropyUnavailable`; there is no fallback.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, TryRngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{AuthError, Result};

/// Number of random bytes behind a verifier or state token (43 base64url chars).
const RANDOM_BYTES: usize = 32;

/// Challenge transformation advertised to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    #[serde(rename = "SHA256")]
    Sha256,
}

impl PkceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
        }
    }
}

/// Verifier/challenge pair for one authorization attempt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
    pub method: PkceMethod,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"[redacted]")
            .field("challenge", &self.challenge)
            .field("method", &self.method)
            .finish()
    }
}

/// Generate a fresh PKCE pair.
pub fn generate_pkce() -> Result<PkcePair> {
    let verifier = random_token()?;
    let challenge = challenge_for(&verifier);
    Ok(PkcePair {
        verifier,
        challenge,
        method: PkceMethod::Sha256,
    })
}

/// Generate a random state parameter with the same entropy as a verifier.
pub fn generate_state() -> Result<String> {
    random_token()
}

/// `base64url(SHA256(verifier))` without padding.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_token() -> Result<String> {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::EntropyUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn challenge_matches_verifier_digest() {
        for _ in 0..32 {
            let pair = generate_pkce().unwrap();
            let digest = Sha256::digest(pair.verifier.as_bytes());
            assert_eq!(URL_SAFE_NO_PAD.encode(digest), pair.challenge);
        }
    }

    #[test]
    fn verifier_is_url_safe_and_within_bounds() {
        let pair = generate_pkce().unwrap();
        assert!((43..=128).contains(&pair.verifier.len()));
        assert!(pair
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(pair.method.as_str(), "SHA256");
    }

    #[test]
    fn challenge_for_known_vector() {
        // RFC 7636 appendix B
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn states_do_not_collide() {
        let states: HashSet<String> = (0..1_000).map(|_| generate_state().unwrap()).collect();
        assert_eq!(states.len(), 1_000);
    }

    #[test]
    fn debug_hides_verifier() {
        let pair = generate_pkce().unwrap();
        assert!(!format!("{pair:?}").contains(&pair.verifier));
    }
}
