//! SQLite user storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use signin_core::auth::{
    AccountTokens, AuthError, LinkedAccount, ProviderKind, Result, UserIdentity, UserRepository,
};
use sqlx::SqlitePool;
use uuid::Uuid;

const SELECT_USER_BY_ACCOUNT: &str = r#"
SELECT u.id, u.name, u.email, u.image
FROM users u
JOIN accounts a ON a.user_id = u.id
WHERE a.provider = ? AND a.subject = ?
"#;

/// SQLite-backed user and account storage.
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    /// Creates a new SQLite user store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                image TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS accounts (
                provider TEXT NOT NULL,
                subject TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                access_token TEXT,
                refresh_token TEXT,
                token_expires_at TEXT,
                PRIMARY KEY (provider, subject),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_accounts_user_id ON accounts(user_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn find_by_account(
        &self,
        provider: ProviderKind,
        subject: &str,
    ) -> Result<Option<UserIdentity>> {
        let row = sqlx::query_as::<_, (String, String, String, String)>(SELECT_USER_BY_ACCOUNT)
            .bind(provider.slug())
            .bind(subject)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        Ok(row.map(user_from_row))
    }
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn find_or_create_user(
        &self,
        provider: ProviderKind,
        subject: &str,
        profile: &UserIdentity,
    ) -> Result<UserIdentity> {
        if let Some(user) = self.find_by_account(provider, subject).await? {
            return Ok(user);
        }

        let user = UserIdentity {
            id: Uuid::new_v4().to_string(),
            ..profile.clone()
        };
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query("INSERT INTO users (id, name, email, image, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.image)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let linked = sqlx::query(
            "INSERT INTO accounts (provider, subject, user_id, created_at) VALUES (?, ?, ?, ?) ON CONFLICT(provider, subject) DO NOTHING",
        )
        .bind(provider.slug())
        .bind(subject)
        .bind(&user.id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if linked.rows_affected() == 1 {
            tx.commit().await.map_err(storage)?;
            return Ok(user);
        }

        // Another sign-in linked this account first; drop our user and use theirs.
        tx.rollback().await.map_err(storage)?;
        self.find_by_account(provider, subject)
            .await?
            .ok_or_else(|| AuthError::Storage(format!("{provider} account vanished during sign-in")))
    }

    async fn link_account(
        &self,
        user_id: &str,
        provider: ProviderKind,
        subject: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (provider, subject, user_id, created_at) VALUES (?, ?, ?, ?) ON CONFLICT(provider, subject) DO NOTHING",
        )
        .bind(provider.slug())
        .bind(subject)
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        let owner = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM accounts WHERE provider = ? AND subject = ?",
        )
        .bind(provider.slug())
        .bind(subject)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        if owner != user_id {
            return Err(AuthError::Storage(format!(
                "{provider} account is linked to another user"
            )));
        }
        Ok(())
    }

    async fn save_account_tokens(
        &self,
        provider: ProviderKind,
        subject: &str,
        tokens: &AccountTokens,
    ) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE accounts SET access_token = ?, refresh_token = ?, token_expires_at = ? WHERE provider = ? AND subject = ?",
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at.map(|t| t.to_rfc3339()))
        .bind(provider.slug())
        .bind(subject)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::Storage(format!("{provider} account is not linked")));
        }
        Ok(())
    }

    async fn get_account(
        &self,
        provider: ProviderKind,
        subject: &str,
    ) -> Result<Option<LinkedAccount>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT user_id, access_token, refresh_token, token_expires_at FROM accounts WHERE provider = ? AND subject = ?",
        )
        .bind(provider.slug())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(|(user_id, access_token, refresh_token, expires_at)| {
            let tokens = match access_token {
                Some(access_token) => Some(AccountTokens {
                    access_token,
                    refresh_token,
                    expires_at: expires_at.as_deref().map(parse_time).transpose()?,
                }),
                None => None,
            };
            Ok(LinkedAccount {
                user_id,
                provider,
                subject: subject.to_string(),
                tokens,
            })
        })
        .transpose()
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserIdentity>> {
        let row = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT id, name, email, image FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(user_from_row))
    }
}

type AccountRow = (String, Option<String>, Option<String>, Option<String>);

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(storage)
}

fn user_from_row((id, name, email, image): (String, String, String, String)) -> UserIdentity {
    UserIdentity {
        id,
        name,
        email,
        image,
    }
}

fn storage(e: impl ToString) -> AuthError {
    AuthError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use super::*;

    async fn store() -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteUserStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn alice() -> UserIdentity {
        UserIdentity {
            id: "u123".to_string(),
            name: "alice".to_string(),
            email: "alice@gmail.com".to_string(),
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn find_or_create_is_stable() {
        let store = store().await;
        let first = store
            .find_or_create_user(ProviderKind::CustomOidc, "u123", &alice())
            .await
            .unwrap();
        let again = store
            .find_or_create_user(ProviderKind::CustomOidc, "u123", &alice())
            .await
            .unwrap();

        assert_eq!(first, again);
        assert_eq!(store.get_user(&first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn link_account_rejects_other_owner() {
        let store = store().await;
        let a = store
            .find_or_create_user(ProviderKind::CustomOidc, "a", &alice())
            .await
            .unwrap();
        let b = store
            .find_or_create_user(ProviderKind::CustomOidc, "b", &alice())
            .await
            .unwrap();

        store
            .link_account(&a.id, ProviderKind::GitHub, "gh-1")
            .await
            .unwrap();
        assert!(store
            .link_account(&b.id, ProviderKind::GitHub, "gh-1")
            .await
            .is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sign_ins_resolve_to_one_user() {
        let path = std::env::temp_dir().join(format!("signin-users-{}.db", Uuid::new_v4()));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        let store = Arc::new(SqliteUserStore::new(pool.clone()));
        store.migrate().await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .find_or_create_user(ProviderKind::CustomOidc, "u123", &alice())
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn tokens_are_kept_on_the_linked_account() {
        let store = store().await;
        let user = store
            .find_or_create_user(ProviderKind::Discord, "8035", &alice())
            .await
            .unwrap();
        assert_eq!(
            store
                .get_account(ProviderKind::Discord, "8035")
                .await
                .unwrap()
                .unwrap()
                .tokens,
            None
        );

        let expires_at = DateTime::parse_from_rfc3339("2026-01-01T00:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let tokens = AccountTokens {
            access_token: "discord-at".to_string(),
            refresh_token: Some("discord-rt".to_string()),
            expires_at: Some(expires_at),
        };
        store
            .save_account_tokens(ProviderKind::Discord, "8035", &tokens)
            .await
            .unwrap();

        let account = store
            .get_account(ProviderKind::Discord, "8035")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.user_id, user.id);
        assert_eq!(account.tokens, Some(tokens.clone()));

        assert!(store
            .save_account_tokens(ProviderKind::GitHub, "8035", &tokens)
            .await
            .is_err());
    }
}
