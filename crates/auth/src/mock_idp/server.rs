//! Mock IdP server for development and testing.
//!
//! Speaks the custom OIDC provider's dialect: PKCE with the `SHA256`
//! method on the authorize step and a JSON body on the token endpoint.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use signin_core::auth::{challenge_for, generate_state, PkceMethod};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use url::Url;

use super::templates::{self, LoginPage};

/// Lifetime of issued access and ID tokens, in seconds.
const TOKEN_TTL_SECS: i64 = 300;
const REFRESH_TTL_SECS: i64 = 1800;

/// A code handed out by the login form, waiting for its token request.
struct IssuedCode {
    username: String,
    code_challenge: String,
    redirect_uri: String,
}

#[derive(Clone)]
struct MockIdpState {
    client_id: String,
    issuer: String,
    signing_key: Arc<Vec<u8>>,
    codes: Arc<Mutex<HashMap<String, IssuedCode>>>,
}

#[derive(Deserialize)]
struct AuthorizeQuery {
    client_id: String,
    redirect_uri: String,
    response_type: String,
    state: String,
    code_challenge: String,
    code_challenge_method: String,
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    state: String,
    redirect_uri: String,
    code_challenge: String,
}

#[derive(Deserialize)]
struct TokenRequest {
    grant_type: String,
    client_id: String,
    code: String,
    code_verifier: String,
    redirect_uri: String,
}

#[derive(Serialize)]
struct IdTokenClaims<'a> {
    iss: &'a str,
    sub: String,
    aud: &'a str,
    preferred_username: &'a str,
    iat: i64,
    exp: i64,
}

/// Mock IdP server that simulates the custom OIDC provider.
pub struct MockIdpServer {
    port: u16,
    client_id: String,
}

impl MockIdpServer {
    /// Create a new Mock IdP server.
    ///
    /// # Arguments
    /// * `port` - The port to listen on (typically 3001)
    /// * `client_id` - The only client id the server accepts
    pub fn new(port: u16, client_id: impl Into<String>) -> Self {
        Self {
            port,
            client_id: client_id.into(),
        }
    }

    /// Build the router without binding a socket.
    ///
    /// Handles:
    /// - `GET /authorize` - login page
    /// - `POST /authorize/submit` - issue a code and redirect back
    /// - `POST /token` - exchange a code (JSON body) for tokens
    ///
    /// # Errors
    ///
    /// Fails only if no randomness is available for the signing key.
    pub fn router(&self) -> Result<Router, signin_core::auth::AuthError> {
        let state = MockIdpState {
            client_id: self.client_id.clone(),
            issuer: format!("http://localhost:{}", self.port),
            signing_key: Arc::new(generate_state()?.into_bytes()),
            codes: Arc::new(Mutex::new(HashMap::new())),
        };

        Ok(Router::new()
            .route("/authorize", get(authorize))
            .route("/authorize/submit", post(authorize_submit))
            .route("/token", post(token))
            .with_state(state))
    }

    /// Run the Mock IdP server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let app = self
            .router()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        tracing::info!("Mock IdP server listening on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await
    }
}

async fn authorize(
    State(state): State<MockIdpState>,
    Query(params): Query<AuthorizeQuery>,
) -> Response {
    if params.response_type != "code" {
        return (StatusCode::BAD_REQUEST, "unsupported response_type").into_response();
    }
    if params.client_id != state.client_id {
        return (StatusCode::BAD_REQUEST, "unknown client_id").into_response();
    }
    if params.code_challenge_method != PkceMethod::Sha256.as_str() {
        return (StatusCode::BAD_REQUEST, "unsupported code_challenge_method").into_response();
    }

    Html(templates::login_page(&LoginPage {
        state: &params.state,
        redirect_uri: &params.redirect_uri,
        code_challenge: &params.code_challenge,
    }))
    .into_response()
}

async fn authorize_submit(
    State(state): State<MockIdpState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let Ok(mut callback) = Url::parse(&form.redirect_uri) else {
        return (StatusCode::BAD_REQUEST, "invalid redirect_uri").into_response();
    };
    let Ok(code) = generate_state() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    state.codes.lock().await.insert(
        code.clone(),
        IssuedCode {
            username: form.username,
            code_challenge: form.code_challenge,
            redirect_uri: form.redirect_uri,
        },
    );

    callback
        .query_pairs_mut()
        .append_pair("code", &code)
        .append_pair("state", &form.state);
    Redirect::to(callback.as_str()).into_response()
}

fn invalid_grant(description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid_grant", "error_description": description})),
    )
        .into_response()
}

async fn token(State(state): State<MockIdpState>, Json(request): Json<TokenRequest>) -> Response {
    if request.grant_type != "authorization_code" {
        return invalid_grant("unsupported grant_type");
    }
    if request.client_id != state.client_id {
        return invalid_grant("unknown client_id");
    }

    // Codes are single-use whether or not the request succeeds.
    let Some(issued) = state.codes.lock().await.remove(&request.code) else {
        return invalid_grant("unknown or used code");
    };
    if issued.redirect_uri != request.redirect_uri {
        return invalid_grant("redirect_uri mismatch");
    }
    if challenge_for(&request.code_verifier) != issued.code_challenge {
        return invalid_grant("code_verifier does not match code_challenge");
    }

    let now = Utc::now().timestamp();
    let claims = IdTokenClaims {
        iss: &state.issuer,
        sub: format!("mock-{}", issued.username),
        aud: &state.client_id,
        preferred_username: &issued.username,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    let id_token = match encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&state.signing_key),
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Mock IdP failed to sign id_token: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (Ok(access_token), Ok(refresh_token)) = (generate_state(), generate_state()) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    Json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": TOKEN_TTL_SECS,
        "refresh_token": refresh_token,
        "refresh_expires_in": REFRESH_TTL_SECS,
        "id_token": id_token,
        "scope": "openid email profile",
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use reqwest::header::LOCATION;
    use signin_core::auth::{AuthError as CoreError, ProviderKind};

    use super::*;
    use crate::config::OidcConfig;
    use crate::error::AuthError;
    use crate::exchange::build_http_client;
    use crate::flow::tests::{state_param, test_config};
    use crate::flow::{begin_sign_in, complete_sign_in, CallbackQuery};
    use crate::providers::CustomOidcProvider;
    use crate::sessions::SessionStore;
    use crate::users::UserStore;
    use crate::AuthState;

    const CLIENT_ID: &str = "signin-dev";

    async fn spawn_idp() -> Url {
        let app = MockIdpServer::new(0, CLIENT_ID).router().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn auth_state(idp: &Url) -> AuthState {
        let config = test_config();
        let oidc = OidcConfig::for_mock_idp(&config.base_url, idp, CLIENT_ID).unwrap();
        let provider = CustomOidcProvider::new(
            &oidc,
            build_http_client(Duration::from_secs(5)).unwrap(),
        );
        AuthState::with_providers(
            Arc::new(SessionStore::new()),
            Arc::new(UserStore::new()),
            config,
            [Arc::new(provider) as Arc<dyn signin_core::auth::IdentityProvider>],
        )
    }

    /// Walks the login page as a browser would and returns the callback query.
    async fn log_in_as(http: &reqwest::Client, authorize: &Url, username: &str) -> CallbackQuery {
        let page = http.get(authorize.clone()).send().await.unwrap();
        assert_eq!(page.status(), StatusCode::OK);

        let query: HashMap<_, _> = authorize.query_pairs().into_owned().collect();
        let submit = authorize.join("/authorize/submit").unwrap();
        let response = http
            .post(submit)
            .form(&[
                ("username", username),
                ("state", query["state"].as_str()),
                ("redirect_uri", query["redirect_uri"].as_str()),
                ("code_challenge", query["code_challenge"].as_str()),
            ])
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection());

        let callback = Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
        let params: HashMap<_, _> = callback.query_pairs().into_owned().collect();
        CallbackQuery {
            code: params.get("code").cloned(),
            state: params.get("state").cloned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn end_to_end_sign_in() {
        let idp = spawn_idp().await;
        let state = auth_state(&idp);
        let http = build_http_client(Duration::from_secs(5)).unwrap();
        let now = Utc::now();

        let authorize = begin_sign_in(&state, ProviderKind::CustomOidc, None, now)
            .await
            .unwrap();
        let callback = log_in_as(&http, &authorize, "alice").await;
        assert_eq!(callback.state, Some(state_param(&authorize)));

        let done = complete_sign_in(&state, ProviderKind::CustomOidc, &callback, now)
            .await
            .unwrap();

        assert_eq!(done.user.name, "alice");
        assert_eq!(done.user.email, "alice@gmail.com");
        assert_eq!(done.user.image, "");
    }

    #[tokio::test]
    async fn rejects_wrong_challenge_method() {
        let idp = spawn_idp().await;
        let mut url = idp.join("/authorize").unwrap();
        url.query_pairs_mut()
            .append_pair("client_id", CLIENT_ID)
            .append_pair("redirect_uri", "http://localhost:3000/auth/oidc/callback")
            .append_pair("response_type", "code")
            .append_pair("state", "s")
            .append_pair("code_challenge", "c")
            .append_pair("code_challenge_method", "plain");

        let response = reqwest::get(url).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn token_requires_matching_verifier() {
        let idp = spawn_idp().await;
        let state = auth_state(&idp);
        let http = build_http_client(Duration::from_secs(5)).unwrap();

        let authorize = begin_sign_in(&state, ProviderKind::CustomOidc, None, Utc::now())
            .await
            .unwrap();
        let callback = log_in_as(&http, &authorize, "mallory").await;

        let response = http
            .post(idp.join("/token").unwrap())
            .json(&json!({
                "grant_type": "authorization_code",
                "client_id": CLIENT_ID,
                "code": callback.code,
                "code_verifier": "not-the-verifier",
                "redirect_uri": "http://localhost:3000/auth/oidc/callback",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // the code was burned by the failed attempt
        let result =
            complete_sign_in(&state, ProviderKind::CustomOidc, &callback, Utc::now()).await;
        assert!(matches!(
            result,
            Err(AuthError::Core(CoreError::TokenExchangeFailed {
                http_status: Some(400),
                ..
            }))
        ));
    }
}
