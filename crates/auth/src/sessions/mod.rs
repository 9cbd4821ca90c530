//! Session and sign-in attempt storage.
//!
//! Provides `SessionRepository` implementations for:
//! - In-memory (always available)
//! - SQLite (with `sqlite` feature)

mod inmemory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use inmemory::SessionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use signin_core::auth::SessionRepository;
use tokio::task::JoinHandle;

/// Periodically evict sign-in attempts older than `ttl`.
///
/// Expired attempts are already refused when a callback presents them; this
/// only reclaims the storage of abandoned flows.
pub fn spawn_attempt_sweeper(
    sessions: Arc<dyn SessionRepository>,
    ttl: Duration,
    period: Duration,
) -> JoinHandle<()> {
    let ttl = crate::config::to_delta(ttl);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match sessions.purge_expired_attempts(Utc::now(), ttl).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired sign-in attempts"),
                Err(e) => tracing::warn!("Failed to purge sign-in attempts: {}", e),
            }
        }
    })
}
