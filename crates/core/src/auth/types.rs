use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PkcePair;

/// Cryptographically random session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported identity providers.
///
/// Each variant carries its own endpoint and claim-mapping rules; see
/// `map_profile` for the per-provider claim shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// The custom OpenID Connect provider (authorization code + PKCE, JSON token endpoint).
    #[serde(rename = "oidc")]
    CustomOidc,
    #[serde(rename = "discord")]
    Discord,
    #[serde(rename = "github")]
    GitHub,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::CustomOidc, Self::Discord, Self::GitHub];

    /// URL path segment for this provider (`/auth/{slug}/login`).
    pub fn slug(&self) -> &'static str {
        match self {
            Self::CustomOidc => "oidc",
            Self::Discord => "discord",
            Self::GitHub => "github",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// Server-side session record; the session cookie holds its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: String,
    pub provider: ProviderKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-flight sign-in attempt, keyed by its state token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationAttempt {
    pub state: String,
    pub pkce: PkcePair,
    pub provider: ProviderKind,
    pub created_at: DateTime<Utc>,
    /// URL to redirect to after successful authentication.
    pub return_to: Option<String>,
}

/// Tokens returned by a provider's token endpoint.
///
/// Only these fields survive parsing; anything else the provider sends
/// (`refresh_expires_in`, `scope`, `not-before-policy`, ...) is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("id_token", &self.id_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Raw claims as returned by a provider. The shape is provider-specific.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderProfile(pub Map<String, Value>);

impl ProviderProfile {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ProviderProfile {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Application-level user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: String,
}

/// A provider account linked to a local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub user_id: String,
    pub provider: ProviderKind,
    pub subject: String,
    /// Tokens from the most recent sign-in through this account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<AccountTokens>,
}

/// Provider tokens kept on a linked account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccountTokens {
    /// Keep the parts of a token response worth storing. `expires_in` is
    /// resolved against `now`; a lifetime too large to represent is dropped.
    pub fn from_response(tokens: &TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_at = tokens
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at,
        }
    }
}

impl std::fmt::Debug for AccountTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountTokens")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_round_trips_through_slug() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.slug().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("google".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_serializes_as_slug() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::GitHub).unwrap(),
            "\"github\""
        );
        assert_eq!(
            serde_json::from_str::<ProviderKind>("\"oidc\"").unwrap(),
            ProviderKind::CustomOidc
        );
    }

    #[test]
    fn token_response_drops_unknown_fields() {
        let json = r#"{
            "access_token": "at",
            "token_type": "Bearer",
            "expires_in": 300,
            "refresh_expires_in": 1800,
            "refresh_token": "rt",
            "id_token": "it",
            "not-before-policy": 0,
            "scope": "openid email profile"
        }"#;
        let tokens: TokenResponse = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&tokens).unwrap();
        assert!(back.get("refresh_expires_in").is_none());
        assert!(back.get("scope").is_none());
        assert_eq!(back["refresh_token"], "rt");
        assert_eq!(tokens.expires_in, Some(300));
    }

    #[test]
    fn token_response_debug_redacts_secrets() {
        let tokens = TokenResponse {
            access_token: "super-secret".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: None,
            refresh_token: Some("also-secret".to_string()),
            id_token: None,
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
    }

    #[test]
    fn account_tokens_resolve_expiry_and_drop_id_token() {
        let now = Utc::now();
        let mut tokens = TokenResponse {
            access_token: "at".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(300),
            refresh_token: Some("rt".to_string()),
            id_token: Some("it".to_string()),
        };

        let stored = AccountTokens::from_response(&tokens, now);
        assert_eq!(stored.access_token, "at");
        assert_eq!(stored.refresh_token.as_deref(), Some("rt"));
        assert_eq!(stored.expires_at, Some(now + chrono::Duration::seconds(300)));
        assert!(!format!("{stored:?}").contains("\"rt\""));

        tokens.expires_in = Some(u64::MAX);
        assert_eq!(AccountTokens::from_response(&tokens, now).expires_at, None);
    }
}
