//! PKCE-protected authorization code exchange for the custom OIDC provider.
//!
//! The provider expects a JSON body (not the usual form encoding), so this
//! client issues the request itself instead of going through `oauth2`.
//! Exactly one request is made per call. Authorization codes are single-use,
//! so there are no retries.

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::Serialize;
use signin_core::auth::{AuthError, Result, TokenResponse};
use url::Url;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Build an HTTP client for provider calls.
///
/// Redirects are not followed and every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("signin/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AuthError::Provider(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    code: &'a str,
    code_verifier: &'a str,
    redirect_uri: &'a str,
}

/// Client for one provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
}

impl TokenExchangeClient {
    pub fn new(http: reqwest::Client, token_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            http,
            token_url,
            client_id: client_id.into(),
        }
    }

    /// Exchange `code` and the attempt's `verifier` for tokens.
    ///
    /// # Errors
    ///
    /// - `TokenExchangeFailed` on timeout, connection failure or a non-2xx status
    /// - `MalformedTokenResponse` if the body is not JSON or lacks required fields
    pub async fn exchange(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let body = TokenRequest {
            grant_type: "authorization_code",
            client_id: &self.client_id,
            code,
            code_verifier: verifier,
            redirect_uri,
        };

        let response = self
            .http
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::exchange_failed(e.status().map(|s| s.as_u16()), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::debug!(http_status = status.as_u16(), "token endpoint rejected exchange");
            return Err(AuthError::exchange_failed(
                Some(status.as_u16()),
                truncate(&text),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AuthError::exchange_failed(Some(status.as_u16()), e))?;

        parse_token_response(&bytes)
    }
}

/// Parse a token endpoint body, keeping only the fields the application uses.
pub fn parse_token_response(body: &[u8]) -> Result<TokenResponse> {
    let tokens: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))?;

    if tokens.access_token.is_empty() {
        return Err(AuthError::MalformedTokenResponse(
            "empty access_token".to_string(),
        ));
    }

    Ok(tokens)
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
