//! In-memory session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use signin_core::auth::{
    is_attempt_expired, AuthorizationAttempt, Result, SessionId, SessionRecord, SessionRepository,
};

/// In-memory session store for development and testing.
///
/// Stores sessions and sign-in attempts in HashMaps wrapped in `Arc<RwLock<_>>`.
/// Data is not persisted and will be lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    attempts: Arc<RwLock<HashMap<String, AuthorizationAttempt>>>,
}

impl SessionStore {
    /// Creates a new empty in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for SessionStore {
    async fn create_session(&self, session: &SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id.as_str()).cloned())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id.as_str());
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn store_attempt(&self, attempt: &AuthorizationAttempt) -> Result<()> {
        let mut attempts = self.attempts.write().await;
        attempts.insert(attempt.state.clone(), attempt.clone());
        Ok(())
    }

    async fn take_attempt(&self, state: &str) -> Result<Option<AuthorizationAttempt>> {
        let mut attempts = self.attempts.write().await;
        Ok(attempts.remove(state))
    }

    async fn purge_expired_attempts(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, attempt| !is_attempt_expired(attempt, now, ttl));
        Ok(before - attempts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signin_core::auth::{generate_pkce, ProviderKind};

    fn create_test_session(id: &str, user_id: &str) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(id.to_string()),
            user_id: user_id.to_string(),
            provider: ProviderKind::CustomOidc,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(24),
        }
    }

    fn create_test_attempt(state: &str, created_at: DateTime<Utc>) -> AuthorizationAttempt {
        AuthorizationAttempt {
            state: state.to_string(),
            pkce: generate_pkce().unwrap(),
            provider: ProviderKind::CustomOidc,
            created_at,
            return_to: None,
        }
    }

    // ==================== Session Tests ====================

    #[tokio::test]
    async fn test_session_create_and_get() {
        let store = SessionStore::new();
        store
            .create_session(&create_test_session("session-1", "user-123"))
            .await
            .unwrap();

        let retrieved = store
            .get_session(&SessionId::new("session-1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.user_id, "user-123");
    }

    #[tokio::test]
    async fn test_session_delete() {
        let store = SessionStore::new();
        let id = SessionId::new("session-1".to_string());
        store
            .create_session(&create_test_session("session-1", "user-123"))
            .await
            .unwrap();

        store.delete_session(&id).await.unwrap();

        assert!(store.get_session(&id).await.unwrap().is_none());
        // deleting again is not an error
        assert!(store.delete_session(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_sessions() {
        let store = SessionStore::new();
        for (id, user) in [("s1", "user-123"), ("s2", "user-123"), ("s3", "user-456")] {
            store
                .create_session(&create_test_session(id, user))
                .await
                .unwrap();
        }

        store.delete_user_sessions("user-123").await.unwrap();

        let [s1, s2, s3] = ["s1", "s2", "s3"].map(|id| SessionId::new(id.to_string()));
        assert!(store.get_session(&s1).await.unwrap().is_none());
        assert!(store.get_session(&s2).await.unwrap().is_none());
        assert!(store.get_session(&s3).await.unwrap().is_some());
    }

    // ==================== Attempt Tests ====================

    #[tokio::test]
    async fn test_attempt_is_single_use() {
        let store = SessionStore::new();
        let attempt = create_test_attempt("state-abc", Utc::now());
        store.store_attempt(&attempt).await.unwrap();

        let taken = store.take_attempt("state-abc").await.unwrap().unwrap();
        assert_eq!(taken.pkce, attempt.pkce);

        assert!(store.take_attempt("state-abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attempt_take_nonexistent() {
        let store = SessionStore::new();
        assert!(store.take_attempt("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_attempts() {
        let store = SessionStore::new();
        let now = Utc::now();
        store
            .store_attempt(&create_test_attempt("old", now - Duration::minutes(11)))
            .await
            .unwrap();
        store
            .store_attempt(&create_test_attempt("fresh", now - Duration::minutes(1)))
            .await
            .unwrap();

        let removed = store
            .purge_expired_attempts(now, Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.take_attempt("old").await.unwrap().is_none());
        assert!(store.take_attempt("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = SessionStore::new();
        let clone = store.clone();

        store
            .create_session(&create_test_session("session-1", "user-123"))
            .await
            .unwrap();

        assert!(clone
            .get_session(&SessionId::new("session-1".to_string()))
            .await
            .unwrap()
            .is_some());
    }
}
