use std::env;

/// Application configuration loaded from environment variables.
///
/// Auth settings live in `signin_auth::AuthConfig`; this holds the rest.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file (default: "signin.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Seconds between sweeps of expired sign-in attempts (default: 60)
    pub attempt_sweep_seconds: u64,
    /// Client id the bundled mock IdP accepts (default: "signin-dev")
    pub mock_idp_client_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SQLITE_PATH` - SQLite database path (default: "signin.db")
    /// - `ATTEMPT_SWEEP_SECONDS` - sweep period for expired attempts (default: 60)
    /// - `MOCK_IDP_CLIENT_ID` - client id for the mock IdP (default: "signin-dev")
    pub fn from_env() -> Self {
        Self {
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "signin.db".to_string()),
            attempt_sweep_seconds: env::var("ATTEMPT_SWEEP_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or(60),
            mock_idp_client_id: env::var("MOCK_IDP_CLIENT_ID")
                .unwrap_or_else(|_| "signin-dev".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
