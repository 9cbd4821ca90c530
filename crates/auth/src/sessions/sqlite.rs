//! SQLite session storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use signin_core::auth::{
    AuthError, AuthorizationAttempt, PkceMethod, PkcePair, ProviderKind, Result, SessionId,
    SessionRecord, SessionRepository,
};
use sqlx::SqlitePool;

type AttemptRow = (String, String, String, String, String, Option<String>);

/// SQLite-backed session storage.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Creates a new SQLite session store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);

            CREATE TABLE IF NOT EXISTS auth_attempts (
                state TEXT PRIMARY KEY,
                pkce_verifier TEXT NOT NULL,
                code_challenge TEXT NOT NULL,
                provider TEXT NOT NULL,
                created_at TEXT NOT NULL,
                return_to TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_auth_attempts_created_at ON auth_attempts(created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionStore {
    async fn create_session(&self, session: &SessionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, provider, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(&session.user_id)
        .bind(session.provider.slug())
        .bind(session.created_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, (String, String, String, String, String)>(
            "SELECT id, user_id, provider, created_at, expires_at FROM sessions WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(|(id, user_id, provider, created_at, expires_at)| {
            Ok(SessionRecord {
                id: SessionId::new(id),
                user_id,
                provider: parse_provider(&provider)?,
                created_at: parse_time(&created_at)?,
                expires_at: parse_time(&expires_at)?,
            })
        })
        .transpose()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(())
    }

    async fn store_attempt(&self, attempt: &AuthorizationAttempt) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO auth_attempts (state, pkce_verifier, code_challenge, provider, created_at, return_to) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&attempt.state)
        .bind(&attempt.pkce.verifier)
        .bind(&attempt.pkce.challenge)
        .bind(attempt.provider.slug())
        .bind(attempt.created_at.to_rfc3339())
        .bind(&attempt.return_to)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn take_attempt(&self, state: &str) -> Result<Option<AuthorizationAttempt>> {
        // SELECT and DELETE share a transaction so a state can only be taken once
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query_as::<_, AttemptRow>(
            "SELECT state, pkce_verifier, code_challenge, provider, created_at, return_to FROM auth_attempts WHERE state = ?",
        )
        .bind(state)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        if row.is_some() {
            sqlx::query("DELETE FROM auth_attempts WHERE state = ?")
                .bind(state)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        row.map(attempt_from_row).transpose()
    }

    async fn purge_expired_attempts(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize> {
        let Some(cutoff) = now.checked_sub_signed(ttl) else {
            return Ok(0);
        };
        let result = sqlx::query("DELETE FROM auth_attempts WHERE created_at <= ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() as usize)
    }
}

fn attempt_from_row(row: AttemptRow) -> Result<AuthorizationAttempt> {
    let (state, verifier, challenge, provider, created_at, return_to) = row;
    Ok(AuthorizationAttempt {
        state,
        pkce: PkcePair {
            verifier,
            challenge,
            method: PkceMethod::Sha256,
        },
        provider: parse_provider(&provider)?,
        created_at: parse_time(&created_at)?,
        return_to,
    })
}

fn parse_provider(value: &str) -> Result<ProviderKind> {
    value.parse().map_err(AuthError::Storage)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(storage)
}

fn storage(e: impl ToString) -> AuthError {
    AuthError::Storage(e.to_string())
}
