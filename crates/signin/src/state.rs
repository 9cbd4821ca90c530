//! Application state.

use std::sync::Arc;

use signin_auth::AuthState;
use signin_core::auth::{SessionRepository, UserRepository};

use crate::config::Config;

// Storage features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!("Cannot enable both 'sqlite' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'sqlite'");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
}

impl AppState {
    pub fn new(auth: AuthState) -> Self {
        Self { auth }
    }
}

impl AsRef<AuthState> for AppState {
    fn as_ref(&self) -> &AuthState {
        &self.auth
    }
}

/// Session and user stores for the enabled storage backend.
pub type Stores = (Arc<dyn SessionRepository>, Arc<dyn UserRepository>);

#[cfg(feature = "inmemory")]
pub async fn build_stores(_config: &Config) -> anyhow::Result<Stores> {
    use signin_auth::{SessionStore, UserStore};

    tracing::info!("Using in-memory session and user storage");
    Ok((Arc::new(SessionStore::new()), Arc::new(UserStore::new())))
}

#[cfg(feature = "sqlite")]
pub async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    use signin_auth::{SqliteSessionStore, SqliteUserStore};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    tracing::info!(path = %config.sqlite_path, "Using SQLite session and user storage");

    let options = SqliteConnectOptions::new()
        .filename(&config.sqlite_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    let sessions = SqliteSessionStore::new(pool.clone());
    sessions.migrate().await?;
    let users = SqliteUserStore::new(pool);
    users.migrate().await?;

    Ok((Arc::new(sessions), Arc::new(users)))
}
