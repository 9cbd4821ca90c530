//! Sign-in orchestration: start an attempt, then complete it on callback.
//!
//! An attempt is consumed by the first callback that presents its state,
//! whatever the outcome. Any failure after that point ends the attempt and
//! the user has to start a fresh login.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use signin_core::auth::{
    calculate_expiry, generate_pkce, generate_session_id, generate_state, is_attempt_expired,
    validate_return_to, AccountTokens, AttemptPhase, AuthError as CoreError,
    AuthorizationAttempt, ProviderKind, SessionRecord, UserIdentity,
};
use url::Url;

use crate::error::AuthError;
use crate::state::AuthState;

/// Query parameters the provider sends back to the callback route.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined at the provider.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Outcome of a successful callback.
#[derive(Debug, Clone)]
pub struct CompletedSignIn {
    pub session: SessionRecord,
    pub user: UserIdentity,
    pub return_to: Option<String>,
}

/// Logs each phase change of one attempt.
struct PhaseTracker {
    provider: ProviderKind,
    phase: AttemptPhase,
}

impl PhaseTracker {
    fn new(provider: ProviderKind, phase: AttemptPhase) -> Self {
        tracing::debug!(provider = %provider, phase = %phase, "sign-in attempt");
        Self { provider, phase }
    }

    fn advance(&mut self, next: AttemptPhase) {
        match self.phase.advance(next) {
            Some(phase) => {
                tracing::debug!(
                    provider = %self.provider,
                    from = %self.phase,
                    phase = %phase,
                    "sign-in attempt"
                );
                self.phase = phase;
            }
            None => tracing::warn!(
                provider = %self.provider,
                from = %self.phase,
                to = %next,
                "ignored invalid sign-in phase transition"
            ),
        }
    }
}

/// Start a sign-in attempt and return the provider URL to redirect to.
///
/// `return_to` is kept only if it is a safe same-origin path.
pub async fn begin_sign_in(
    state: &AuthState,
    provider: ProviderKind,
    return_to: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Url, AuthError> {
    let client = state.get_provider(provider)?;
    let mut tracker = PhaseTracker::new(provider, AttemptPhase::Initiated);

    let attempt = AuthorizationAttempt {
        state: generate_state()?,
        pkce: generate_pkce()?,
        provider,
        created_at: now,
        return_to: return_to.and_then(validate_return_to).map(String::from),
    };
    let url = client.authorization_url(&attempt.pkce, &attempt.state)?;

    state.sessions.store_attempt(&attempt).await?;
    tracker.advance(AttemptPhase::Authorizing);

    Ok(url)
}

/// Complete a sign-in attempt from the provider's callback.
///
/// # Errors
///
/// - `InvalidState` if the state is unknown, already used, expired, or was
///   issued for another provider
/// - `ProviderDenied` if the provider reported an error instead of a code
/// - whatever the exchange, profile mapping or storage step fails with
pub async fn complete_sign_in(
    state: &AuthState,
    provider: ProviderKind,
    callback: &CallbackQuery,
    now: DateTime<Utc>,
) -> Result<CompletedSignIn, AuthError> {
    let csrf_state = callback.state.as_deref().ok_or(CoreError::InvalidState)?;
    let attempt = state
        .sessions
        .take_attempt(csrf_state)
        .await?
        .ok_or(CoreError::InvalidState)?;

    let mut tracker = PhaseTracker::new(attempt.provider, AttemptPhase::Authorizing);
    tracker.advance(AttemptPhase::CallbackReceived);

    let result = finish(state, &attempt, provider, callback, now, &mut tracker).await;
    match &result {
        Ok(_) => tracker.advance(AttemptPhase::Established),
        Err(e) => {
            tracing::debug!(provider = %attempt.provider, "sign-in attempt failed: {}", e);
            tracker.advance(AttemptPhase::Failed);
        }
    }
    result
}

async fn finish(
    state: &AuthState,
    attempt: &AuthorizationAttempt,
    provider: ProviderKind,
    callback: &CallbackQuery,
    now: DateTime<Utc>,
    tracker: &mut PhaseTracker,
) -> Result<CompletedSignIn, AuthError> {
    let attempt_ttl = state.config.attempt_ttl_delta();
    if attempt.provider != provider || is_attempt_expired(attempt, now, attempt_ttl) {
        return Err(CoreError::InvalidState.into());
    }

    if let Some(error) = &callback.error {
        let detail = match &callback.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error.clone(),
        };
        return Err(AuthError::ProviderDenied(detail));
    }

    let code = callback.code.as_deref().ok_or(CoreError::InvalidState)?;
    let client = state.get_provider(provider)?;

    tracker.advance(AttemptPhase::Exchanging);
    let tokens = client.exchange_code(code, &attempt.pkce.verifier).await?;
    let profile = client.fetch_profile(&tokens).await?;
    let identity = client.map_profile(&profile)?;

    let user = state
        .users
        .find_or_create_user(provider, &identity.id, &identity)
        .await?;
    state
        .users
        .link_account(&user.id, provider, &identity.id)
        .await?;
    state
        .users
        .save_account_tokens(
            provider,
            &identity.id,
            &AccountTokens::from_response(&tokens, now),
        )
        .await?;

    let session = SessionRecord {
        id: generate_session_id(),
        user_id: user.id.clone(),
        provider,
        created_at: now,
        expires_at: calculate_expiry(now, state.config.session_ttl_delta()),
    };
    state.sessions.create_session(&session).await?;

    tracing::info!(provider = %provider, user_id = %user.id, "sign-in established");

    Ok(CompletedSignIn {
        session,
        user,
        return_to: attempt.return_to.clone(),
    })
}
