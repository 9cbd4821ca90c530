//! Application state for auth.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRef;
use signin_core::auth::{IdentityProvider, ProviderKind, SessionRepository, UserRepository};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::exchange::build_http_client;
use crate::providers::{CustomOidcProvider, OAuthProvider};

/// Shared state for auth handlers.
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionRepository>,
    pub users: Arc<dyn UserRepository>,
    pub config: AuthConfig,
    providers: HashMap<ProviderKind, Arc<dyn IdentityProvider>>,
}

impl AuthState {
    /// Creates a new AuthState, building a client for every configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or a provider's
    /// endpoints are invalid.
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let http = build_http_client(config.exchange_timeout)?;
        let mut providers: Vec<Arc<dyn IdentityProvider>> = Vec::new();

        if let Some(ref oidc) = config.oidc {
            providers.push(Arc::new(CustomOidcProvider::new(oidc, http.clone())));
        }
        if let Some(ref discord) = config.discord {
            providers.push(Arc::new(OAuthProvider::new(
                ProviderKind::Discord,
                discord,
                http.clone(),
            )?));
        }
        if let Some(ref github) = config.github {
            providers.push(Arc::new(OAuthProvider::new(
                ProviderKind::GitHub,
                github,
                http,
            )?));
        }

        Ok(Self::with_providers(sessions, users, config, providers))
    }

    /// Creates an AuthState with explicit provider clients.
    pub fn with_providers(
        sessions: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        config: AuthConfig,
        providers: impl IntoIterator<Item = Arc<dyn IdentityProvider>>,
    ) -> Self {
        let providers = providers.into_iter().map(|p| (p.kind(), p)).collect();

        Self {
            sessions,
            users,
            config,
            providers,
        }
    }

    /// Gets the client for the given provider.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotConfigured` if the provider is not enabled.
    pub fn get_provider(&self, provider: ProviderKind) -> Result<&dyn IdentityProvider, AuthError> {
        self.providers
            .get(&provider)
            .map(|p| p.as_ref())
            .ok_or_else(|| AuthError::ProviderNotConfigured(provider.to_string()))
    }

    /// Enabled providers, in a stable order.
    pub fn providers(&self) -> impl Iterator<Item = &dyn IdentityProvider> {
        ProviderKind::ALL
            .into_iter()
            .filter_map(|kind| self.providers.get(&kind).map(|p| p.as_ref()))
    }
}

/// Allows AuthState to be extracted from a parent state.
impl<S> FromRef<S> for AuthState
where
    S: AsRef<AuthState>,
{
    fn from_ref(state: &S) -> Self {
        state.as_ref().clone()
    }
}
