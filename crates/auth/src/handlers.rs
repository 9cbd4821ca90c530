//! HTTP handlers for auth routes.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, Redirect},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use signin_core::auth::ProviderKind;

use crate::error::AuthError;
use crate::extractors::{session_id_from_headers, CurrentSession, OptionalSession};
use crate::flow::{begin_sign_in, complete_sign_in, CallbackQuery};
use crate::AuthState;

/// Query parameters for login endpoints.
#[derive(Deserialize, Default)]
pub struct LoginQuery {
    /// URL to redirect to after successful authentication.
    #[serde(default, deserialize_with = "signin_core::serde::deserialize_optional_string")]
    pub return_to: Option<String>,
}

#[derive(Deserialize)]
struct ErrorQuery {
    error: Option<String>,
}

/// An enabled provider, as listed by `GET /auth/providers`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: ProviderKind,
    pub name: String,
    pub login_url: String,
}

/// Creates the auth router with all authentication routes.
///
/// Routes:
/// - `GET /auth/providers` - List enabled providers
/// - `GET /auth/{provider}/login` - Start a sign-in attempt
/// - `GET /auth/{provider}/callback` - Complete the attempt
/// - `GET /auth/session` - Current session, or `{}`
/// - `POST /auth/logout` - End current session
/// - `POST /auth/logout-all` - End all sessions for current user
/// - `GET /auth/error` - Sign-in error page
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route("/auth/providers", get(providers))
        .route("/auth/session", get(session))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/error", get(error_page))
        .route("/auth/{provider}/login", get(login))
        .route("/auth/{provider}/callback", get(callback))
}

fn parse_provider(provider: &str) -> Result<ProviderKind, AuthError> {
    provider
        .parse()
        .map_err(|_| AuthError::ProviderNotConfigured(provider.to_string()))
}

async fn providers(State(state): State<AuthState>) -> Json<Vec<ProviderInfo>> {
    Json(
        state
            .providers()
            .map(|p| ProviderInfo {
                id: p.kind(),
                name: p.display_name().to_string(),
                login_url: format!("/auth/{}/login", p.kind().slug()),
            })
            .collect(),
    )
}

async fn login(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, AuthError> {
    let provider = parse_provider(&provider)?;
    let auth_url = begin_sign_in(&state, provider, query.return_to.as_deref(), Utc::now()).await?;

    Ok(Redirect::to(auth_url.as_str()))
}

async fn callback(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    let provider = parse_provider(&provider)?;
    let done = complete_sign_in(&state, provider, &query, Utc::now()).await?;

    let cookie = Cookie::build((state.config.cookie_name.clone(), done.session.id.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(
            time::Duration::try_from(state.config.session_ttl).unwrap_or(time::Duration::MAX),
        )
        .build();

    let jar = jar.add(cookie);

    let redirect_url = done.return_to.unwrap_or_else(|| "/".to_string());
    Ok((jar, Redirect::to(&redirect_url)))
}

async fn session(OptionalSession(session): OptionalSession) -> Json<Value> {
    match session {
        Some(session) => Json(json!(session)),
        None => Json(json!({})),
    }
}

async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    if let Some(session_id) = session_id_from_headers(&headers, &state.config.cookie_name) {
        state.sessions.delete_session(&session_id).await?;
    }

    let jar = jar.remove(Cookie::build(state.config.cookie_name.clone()).path("/"));
    Ok(jar)
}

async fn logout_all(
    State(state): State<AuthState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    if let Some(user_id) = &session.user.id {
        state.sessions.delete_user_sessions(user_id).await?;
    }

    let jar = jar.remove(Cookie::build(state.config.cookie_name.clone()).path("/"));
    Ok(jar)
}

async fn error_page(Query(query): Query<ErrorQuery>) -> Html<String> {
    let message = match query.error.as_deref() {
        Some("profile") => "Your account did not share enough profile information to sign in.",
        Some("denied") => "Sign-in was cancelled at the provider.",
        _ => "Sign-in failed, please try again.",
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed</title></head>
<body>
    <h1>Sign-in failed</h1>
    <p>{message}</p>
    <p><a href="/">Back to sign-in</a></p>
</body>
</html>"#
    ))
}
