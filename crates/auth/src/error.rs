use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

/// Auth errors for the signin_auth crate.
///
/// This wraps the core `AuthError` and adds crate-specific error variants
/// for I/O operations that can't be in the functional core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (state, exchange, profile, storage).
    #[error(transparent)]
    Core(#[from] signin_core::auth::AuthError),

    /// HTTP client error outside the token exchange itself
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider not configured
    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// The user declined (or the provider refused) at the authorize step
    #[error("provider returned error: {0}")]
    ProviderDenied(String),
}

/// Message shown for any failed sign-in. Details stay in the logs.
const SIGN_IN_FAILED: &str = "Sign-in failed, please try again";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use signin_core::auth::AuthError as CoreError;

        let (status, message) = match &self {
            AuthError::Core(core_err) => match core_err {
                CoreError::InvalidState => {
                    tracing::warn!("Rejected sign-in callback: {}", self);
                    (StatusCode::BAD_REQUEST, SIGN_IN_FAILED.to_string())
                }
                CoreError::TokenExchangeFailed { http_status, .. } => {
                    tracing::warn!(http_status = ?http_status, "Token exchange failed: {}", self);
                    (StatusCode::BAD_GATEWAY, SIGN_IN_FAILED.to_string())
                }
                CoreError::MalformedTokenResponse(_) => {
                    tracing::error!("Provider returned a malformed token response: {}", self);
                    (StatusCode::BAD_GATEWAY, SIGN_IN_FAILED.to_string())
                }
                CoreError::IncompleteProfile(_) => {
                    tracing::warn!("Cannot establish identity: {}", self);
                    return Redirect::to("/auth/error?error=profile").into_response();
                }
                CoreError::SessionNotFound | CoreError::SessionExpired => {
                    (StatusCode::UNAUTHORIZED, self.to_string())
                }
                CoreError::EntropyUnavailable(_)
                | CoreError::Storage(_)
                | CoreError::Provider(_) => {
                    tracing::error!("Auth error: {}", self);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            AuthError::Http(_) => {
                tracing::error!("HTTP error during auth: {}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "Authentication provider error".to_string(),
                )
            }
            AuthError::Config(_) => {
                tracing::error!("Config error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AuthError::ProviderDenied(_) => {
                tracing::info!("Sign-in declined: {}", self);
                return Redirect::to("/auth/error?error=denied").into_response();
            }
            AuthError::ProviderNotConfigured(provider) => (
                StatusCode::NOT_FOUND,
                format!("Authentication provider '{}' is not configured", provider),
            ),
        };

        (status, message).into_response()
    }
}
