//! Identity provider implementations.
//!
//! This module contains implementations of `IdentityProvider` for:
//! - the custom OIDC provider (JSON token exchange, claims from the ID token)
//! - Discord and GitHub (standard OAuth via the `oauth2` crate)

mod oauth;
mod oidc;

pub use oauth::{OAuthEndpoints, OAuthProvider};
pub use oidc::{decode_id_token_claims, CustomOidcProvider};

use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use signin_core::auth::{AuthError, ProviderProfile, Result};
use url::Url;

/// GET a userinfo endpoint with a bearer token and return its JSON object.
pub(crate) async fn fetch_userinfo(
    http: &reqwest::Client,
    url: &Url,
    access_token: &str,
) -> Result<ProviderProfile> {
    let response = http
        .get(url.clone())
        .bearer_auth(access_token)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("userinfo request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::Provider(format!(
            "userinfo request returned HTTP {}",
            status.as_u16()
        )));
    }

    let claims: Map<String, Value> = response
        .json()
        .await
        .map_err(|e| AuthError::Provider(format!("userinfo response is not a JSON object: {e}")))?;

    Ok(ProviderProfile::new(claims))
}
