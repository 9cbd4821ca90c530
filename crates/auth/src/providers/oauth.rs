//! Standard OAuth 2.0 providers (Discord, GitHub).
//!
//! These are not OIDC: there is no ID token, so the profile is fetched from
//! the provider's user endpoint after the code exchange.

use async_trait::async_trait;
use oauth2::{
    basic::{BasicClient, BasicErrorResponse},
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, HttpRequest, HttpResponse, PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope,
    TokenResponse as OAuthTokenResponse, TokenUrl,
};
use secrecy::ExposeSecret;
use signin_core::auth::{
    AuthError, IdentityProvider, PkcePair, ProviderKind, ProviderProfile, Result, TokenResponse,
};
use url::Url;

use super::fetch_userinfo;
use crate::config::ProviderConfig;

/// Type alias for a BasicClient with authorization and token endpoints set.
///
/// Type parameters, in order: auth URL, device auth URL, introspection URL,
/// revocation URL, token URL.
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Endpoints and scopes of a standard OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthEndpoints {
    pub authorize_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub scopes: Vec<String>,
}

impl OAuthEndpoints {
    pub fn discord() -> Result<Self> {
        Self::from_parts(
            "https://discord.com/api/oauth2/authorize",
            "https://discord.com/api/oauth2/token",
            "https://discord.com/api/users/@me",
            &["identify", "email"],
        )
    }

    pub fn github() -> Result<Self> {
        Self::from_parts(
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
            "https://api.github.com/user",
            &["read:user", "user:email"],
        )
    }

    /// Well-known endpoints for `kind`, if it is a standard OAuth provider.
    pub fn for_kind(kind: ProviderKind) -> Result<Self> {
        match kind {
            ProviderKind::Discord => Self::discord(),
            ProviderKind::GitHub => Self::github(),
            ProviderKind::CustomOidc => Err(AuthError::Provider(
                "the custom OIDC provider has no built-in endpoints".to_string(),
            )),
        }
    }

    fn from_parts(authorize: &str, token: &str, userinfo: &str, scopes: &[&str]) -> Result<Self> {
        let parse = |s: &str| Url::parse(s).map_err(|e| AuthError::Provider(e.to_string()));
        Ok(Self {
            authorize_url: parse(authorize)?,
            token_url: parse(token)?,
            userinfo_url: parse(userinfo)?,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// A standard OAuth provider, tagged with which one it is.
pub struct OAuthProvider {
    kind: ProviderKind,
    client: ConfiguredClient,
    userinfo_url: Url,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

impl OAuthProvider {
    /// Create a provider using the well-known endpoints for `kind`.
    pub fn new(
        kind: ProviderKind,
        config: &ProviderConfig,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        Self::with_endpoints(kind, config, OAuthEndpoints::for_kind(kind)?, http_client)
    }

    /// Create a provider with explicit endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if any endpoint or the redirect URI is invalid.
    pub fn with_endpoints(
        kind: ProviderKind,
        config: &ProviderConfig,
        endpoints: OAuthEndpoints,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let provider_err = |e: url::ParseError| AuthError::Provider(e.to_string());

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                config.client_secret.expose_secret().clone(),
            ))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(AuthUrl::new(endpoints.authorize_url.to_string()).map_err(provider_err)?)
            .set_token_uri(TokenUrl::new(endpoints.token_url.to_string()).map_err(provider_err)?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.to_string()).map_err(provider_err)?,
            );

        Ok(Self {
            kind,
            client,
            userinfo_url: endpoints.userinfo_url,
            scopes: endpoints.scopes,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for OAuthProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn display_name(&self) -> &str {
        match self.kind {
            ProviderKind::Discord => "Discord",
            ProviderKind::GitHub => "GitHub",
            ProviderKind::CustomOidc => "OAuth",
        }
    }

    fn authorization_url(&self, pkce: &PkcePair, state: &str) -> Result<Url> {
        let state_owned = state.to_string();

        // Standard providers expect the RFC 7636 method name.
        let (auth_url, _csrf_token) = self
            .client
            .authorize_url(move || CsrfToken::new(state_owned))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("code_challenge", pkce.challenge.clone())
            .add_extra_param("code_challenge_method", "S256")
            .url();

        Ok(auth_url)
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<TokenResponse> {
        let http_client = |request: HttpRequest| {
            let client = self.http_client.clone();
            async move { Self::send_token_request(&client, request).await }
        };
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&http_client)
            .await
            .map_err(map_token_error)?;

        Ok(TokenResponse {
            access_token: token_response.access_token().secret().clone(),
            token_type: token_response.token_type().as_ref().to_string(),
            expires_in: token_response.expires_in().map(|d| d.as_secs()),
            refresh_token: token_response
                .refresh_token()
                .map(|t| t.secret().clone()),
            id_token: None,
        })
    }

    async fn fetch_profile(&self, tokens: &TokenResponse) -> Result<ProviderProfile> {
        fetch_userinfo(&self.http_client, &self.userinfo_url, &tokens.access_token).await
    }
}

impl OAuthProvider {
    /// Send the token request `oauth2` built.
    ///
    /// A non-2xx status fails here with the status attached, before `oauth2`
    /// tries to read the body as a token or error response.
    async fn send_token_request(
        http_client: &reqwest::Client,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let (parts, body) = request.into_parts();

        let response = http_client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::exchange_failed(e.status().map(|s| s.as_u16()), e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::exchange_failed(Some(status.as_u16()), e))?;

        if !status.is_success() {
            return Err(AuthError::exchange_failed(
                Some(status.as_u16()),
                String::from_utf8_lossy(&body).trim(),
            ));
        }

        let mut http_response = HttpResponse::new(body.to_vec());
        *http_response.status_mut() = status;
        *http_response.headers_mut() = headers;
        Ok(http_response)
    }
}

fn map_token_error(err: RequestTokenError<AuthError, BasicErrorResponse>) -> AuthError {
    match err {
        RequestTokenError::Request(e) => e,
        // A 2xx other than 200 with an OAuth error body.
        RequestTokenError::ServerResponse(response) => AuthError::exchange_failed(None, response),
        RequestTokenError::Parse(e, _body) => AuthError::MalformedTokenResponse(e.to_string()),
        RequestTokenError::Other(message) => AuthError::MalformedTokenResponse(message),
    }
}
