mod authorize;
mod error;
mod functions;
mod phase;
mod pkce;
mod profile;
mod session;
mod traits;
mod types;
mod validation;

pub use authorize::{build_authorization_url, DEFAULT_SCOPE};
pub use error::AuthError;
pub use functions::{calculate_expiry, generate_session_id, is_attempt_expired, is_session_expired};
pub use phase::AttemptPhase;
pub use pkce::{challenge_for, generate_pkce, generate_state, PkceMethod, PkcePair};
pub use session::{bind_session, Session, SessionUser};
pub use traits::{IdentityProvider, Result, SessionRepository, UserRepository};
pub use types::{
    AccountTokens, AuthorizationAttempt, LinkedAccount, ProviderKind, ProviderProfile, SessionId, SessionRecord,
    TokenResponse, UserIdentity,
};
pub use validation::validate_return_to;
