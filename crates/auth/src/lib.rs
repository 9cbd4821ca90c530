//! OIDC + PKCE sign-in for axum applications.
//!
//! This crate provides:
//! - Identity providers: a custom OIDC provider plus Discord and GitHub
//! - The sign-in flow (attempt store, token exchange, profile mapping)
//! - Session and user storage (in-memory, or SQLite via the `sqlite` feature)
//! - Axum routes and extractors for authentication

mod config;
mod error;
mod exchange;
mod extractors;
mod flow;
mod handlers;
mod providers;
mod sessions;
mod state;
mod users;

pub mod mock_idp;

pub use config::{callback_url, AuthConfig, OidcConfig, ProviderConfig};
pub use error::AuthError;
pub use exchange::{build_http_client, parse_token_response, TokenExchangeClient};
pub use extractors::{CurrentSession, OptionalSession};
pub use flow::{begin_sign_in, complete_sign_in, CallbackQuery, CompletedSignIn};
pub use handlers::{auth_routes, LoginQuery, ProviderInfo};
pub use providers::{decode_id_token_claims, CustomOidcProvider, OAuthEndpoints, OAuthProvider};
pub use sessions::{spawn_attempt_sweeper, SessionStore};
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionStore;
pub use state::AuthState;
pub use users::UserStore;
#[cfg(feature = "sqlite")]
pub use users::SqliteUserStore;
