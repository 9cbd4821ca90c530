use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};

use super::{AuthorizationAttempt, SessionId, SessionRecord};

/// Generate a cryptographically random session ID.
pub fn generate_session_id() -> SessionId {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    SessionId::new(id)
}

/// Check if a session has expired.
pub fn is_session_expired(session: &SessionRecord, now: DateTime<Utc>) -> bool {
    session.expires_at <= now
}

/// Check if an authorization attempt has outlived its TTL.
///
/// A TTL that reaches past the representable range never expires.
pub fn is_attempt_expired(attempt: &AuthorizationAttempt, now: DateTime<Utc>, ttl: Duration) -> bool {
    attempt
        .created_at
        .checked_add_signed(ttl)
        .is_some_and(|deadline| deadline <= now)
}

/// Calculate session expiry from creation time and TTL, saturating at the
/// latest representable instant.
pub fn calculate_expiry(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    created_at
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
