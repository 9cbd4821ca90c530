//! Axum extractors for authentication.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use signin_core::auth::{bind_session, is_session_expired, Session, SessionId};

use crate::AuthState;

type Rejection = (StatusCode, &'static str);

/// Extractor for the signed-in user's session. Returns 401 if not authenticated.
///
/// The session is rebuilt from the stored user on every request, with the
/// local user id bound in.
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        resolve_session(&auth_state, &parts.headers)
            .await
            .map(CurrentSession)
    }
}

/// Extractor for an optional session. Returns None if not authenticated.
pub struct OptionalSession(pub Option<Session>);

impl<S> FromRequestParts<S> for OptionalSession
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        Ok(OptionalSession(
            resolve_session(&auth_state, &parts.headers).await.ok(),
        ))
    }
}

/// Session id from a `Bearer` header (API clients) or the session cookie.
pub(crate) fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| SessionId::new(token.to_string()));

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(cookie_name)
            .map(|cookie| SessionId::new(cookie.value().to_string()))
    })
}

async fn resolve_session(auth_state: &AuthState, headers: &HeaderMap) -> Result<Session, Rejection> {
    let session_id = session_id_from_headers(headers, &auth_state.config.cookie_name)
        .ok_or((StatusCode::UNAUTHORIZED, "No session"))?;

    let record = auth_state
        .sessions
        .get_session(&session_id)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed"))?
        .ok_or((StatusCode::UNAUTHORIZED, "Session not found"))?;

    if is_session_expired(&record, Utc::now()) {
        return Err((StatusCode::UNAUTHORIZED, "Session expired"));
    }

    let user = auth_state
        .users
        .get_user(&record.user_id)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "User lookup failed"))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found"))?;

    Ok(bind_session(
        &Session::for_user(&user, record.expires_at),
        &user,
    ))
}
