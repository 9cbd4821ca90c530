//! Custom OpenID Connect provider.
//!
//! The provider has no discovery document; its endpoints come from config.
//! Authorization uses PKCE with the `SHA256` challenge method, the token
//! endpoint takes a JSON body, and profile claims are read from the ID
//! token unless a userinfo endpoint is configured.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use signin_core::auth::{
    build_authorization_url, AuthError, IdentityProvider, PkcePair, ProviderKind,
    ProviderProfile, Result, TokenResponse,
};
use url::Url;

use super::fetch_userinfo;
use crate::config::OidcConfig;
use crate::exchange::TokenExchangeClient;

/// The custom OIDC provider.
pub struct CustomOidcProvider {
    config: OidcConfig,
    exchange: TokenExchangeClient,
    http_client: reqwest::Client,
}

impl CustomOidcProvider {
    pub fn new(config: &OidcConfig, http_client: reqwest::Client) -> Self {
        let exchange = TokenExchangeClient::new(
            http_client.clone(),
            config.token_url.clone(),
            config.client_id.clone(),
        );

        Self {
            config: config.clone(),
            exchange,
            http_client,
        }
    }
}

#[async_trait]
impl IdentityProvider for CustomOidcProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CustomOidc
    }

    fn display_name(&self) -> &str {
        &self.config.name
    }

    fn authorization_url(&self, pkce: &PkcePair, state: &str) -> Result<Url> {
        Ok(build_authorization_url(
            &self.config.authorize_url,
            &self.config.client_id,
            &self.config.scope,
            pkce,
            state,
            self.config.redirect_uri.as_str(),
        ))
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<TokenResponse> {
        self.exchange
            .exchange(code, pkce_verifier, self.config.redirect_uri.as_str())
            .await
    }

    async fn fetch_profile(&self, tokens: &TokenResponse) -> Result<ProviderProfile> {
        if let Some(userinfo_url) = &self.config.userinfo_url {
            return fetch_userinfo(&self.http_client, userinfo_url, &tokens.access_token).await;
        }

        let id_token = tokens
            .id_token
            .as_deref()
            .ok_or_else(|| AuthError::IncompleteProfile("id_token".to_string()))?;

        decode_id_token_claims(id_token)
    }
}

/// Read the claims of an ID token received directly from the token endpoint.
///
/// The token arrives over the back-channel TLS connection to the issuer, so
/// the signature is not checked here.
pub fn decode_id_token_claims(id_token: &str) -> Result<ProviderProfile> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Map<String, Value>>(id_token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| AuthError::MalformedTokenResponse(format!("unreadable id_token: {e}")))?;

    Ok(ProviderProfile::new(data.claims))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use signin_core::auth::generate_pkce;

    use super::*;
    use crate::exchange::build_http_client;

    fn config() -> OidcConfig {
        OidcConfig {
            name: "SIMAS-ID".to_string(),
            client_id: "my-client".to_string(),
            authorize_url: Url::parse("https://login.example.com/v2/oidc/authorize").unwrap(),
            token_url: Url::parse("https://api.example.com/v1/oidc/token").unwrap(),
            userinfo_url: None,
            scope: "openid email profile".to_string(),
            redirect_uri: Url::parse("http://localhost:3000/auth/oidc/callback").unwrap(),
        }
    }

    fn provider() -> CustomOidcProvider {
        CustomOidcProvider::new(&config(), build_http_client(Duration::from_secs(5)).unwrap())
    }

    fn tokens(id_token: Option<String>) -> TokenResponse {
        TokenResponse {
            access_token: "at".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(300),
            refresh_token: None,
            id_token,
        }
    }

    #[test]
    fn authorization_url_targets_configured_endpoint() {
        let pkce = generate_pkce().unwrap();
        let url = provider().authorization_url(&pkce, "state-1").unwrap();
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("login.example.com"));
        assert_eq!(query["code_challenge"], pkce.challenge);
        assert_eq!(query["code_challenge_method"], "SHA256");
        assert_eq!(query["redirect_uri"], "http://localhost:3000/auth/oidc/callback");
    }

    #[tokio::test]
    async fn profile_comes_from_id_token_claims() {
        let id_token = encode(
            &Header::default(),
            &json!({"sub": "u123", "preferred_username": "alice", "aud": "my-client"}),
            &EncodingKey::from_secret(b"test"),
        )
        .unwrap();

        let provider = provider();
        let profile = provider.fetch_profile(&tokens(Some(id_token))).await.unwrap();
        let user = provider.map_profile(&profile).unwrap();

        assert_eq!(user.id, "u123");
        assert_eq!(user.email, "alice@gmail.com");
    }

    #[tokio::test]
    async fn missing_id_token_is_incomplete_profile() {
        let result = provider().fetch_profile(&tokens(None)).await;
        assert!(matches!(result, Err(AuthError::IncompleteProfile(_))));
    }

    #[test]
    fn garbage_id_token_is_malformed() {
        assert!(matches!(
            decode_id_token_claims("not.a.jwt"),
            Err(AuthError::MalformedTokenResponse(_))
        ));
    }
}
