use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use url::Url;

use super::{
    AccountTokens, AuthError, AuthorizationAttempt, LinkedAccount, PkcePair, ProviderKind,
    ProviderProfile, SessionId, SessionRecord, TokenResponse, UserIdentity,
};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// One configured identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Which provider this client represents.
    fn kind(&self) -> ProviderKind;

    /// Human readable name for login pages.
    fn display_name(&self) -> &str;

    /// Authorization URL the browser is redirected to.
    fn authorization_url(&self, pkce: &PkcePair, state: &str) -> Result<Url>;

    /// Exchange an authorization code (plus the attempt's verifier) for tokens.
    ///
    /// Called at most once per attempt. Implementations must not retry.
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<TokenResponse>;

    /// Fetch or decode the raw profile claims behind `tokens`.
    async fn fetch_profile(&self, tokens: &TokenResponse) -> Result<ProviderProfile>;

    /// Normalize the raw claims into a `UserIdentity`.
    fn map_profile(&self, profile: &ProviderProfile) -> Result<UserIdentity> {
        self.kind().map_profile(profile)
    }
}

/// Session and in-flight attempt storage.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session.
    async fn create_session(&self, session: &SessionRecord) -> Result<()>;

    /// Retrieve session by ID.
    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Delete a specific session.
    async fn delete_session(&self, id: &SessionId) -> Result<()>;

    /// Delete all sessions for a user (logout-all).
    async fn delete_user_sessions(&self, user_id: &str) -> Result<()>;

    /// Store an attempt under its state token.
    async fn store_attempt(&self, attempt: &AuthorizationAttempt) -> Result<()>;

    /// Retrieve and delete an attempt. A second call for the same state returns `None`.
    async fn take_attempt(&self, state: &str) -> Result<Option<AuthorizationAttempt>>;

    /// Drop attempts older than `ttl`, returning how many were removed.
    async fn purge_expired_attempts(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize>;
}

/// User and linked-account persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Resolve the user linked to `(provider, subject)`, creating both the user
    /// and the link if none exists.
    ///
    /// Must behave as an upsert: concurrent calls for the same pair resolve
    /// to the same user.
    async fn find_or_create_user(
        &self,
        provider: ProviderKind,
        subject: &str,
        profile: &UserIdentity,
    ) -> Result<UserIdentity>;

    /// Link a provider account to an existing user. Idempotent for the same user.
    async fn link_account(&self, user_id: &str, provider: ProviderKind, subject: &str)
        -> Result<()>;

    /// Replace the tokens stored on a linked account.
    ///
    /// Fails with `Storage` if the account is not linked.
    async fn save_account_tokens(
        &self,
        provider: ProviderKind,
        subject: &str,
        tokens: &AccountTokens,
    ) -> Result<()>;

    /// Get a linked account and its stored tokens.
    async fn get_account(&self, provider: ProviderKind, subject: &str)
        -> Result<Option<LinkedAccount>>;

    /// Get a user by local id.
    async fn get_user(&self, id: &str) -> Result<Option<UserIdentity>>;
}
