use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("secure randomness source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("invalid or expired sign-in state")]
    InvalidState,

    #[error("token exchange failed{}: {cause}", format_status(.http_status))]
    TokenExchangeFailed {
        http_status: Option<u16>,
        cause: String,
    },

    #[error("malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("incomplete provider profile: missing {0}")]
    IncompleteProfile(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Builds a `TokenExchangeFailed` from anything printable.
    pub fn exchange_failed(http_status: Option<u16>, cause: impl ToString) -> Self {
        Self::TokenExchangeFailed {
            http_status,
            cause: cause.to_string(),
        }
    }
}

fn format_status(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (HTTP {s})"))
        .unwrap_or_default()
}
