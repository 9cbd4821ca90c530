use std::time::Duration;

use secrecy::SecretString;
use signin_core::auth::{ProviderKind, DEFAULT_SCOPE};
use url::Url;

use crate::error::AuthError;

/// Configuration for the custom OpenID Connect provider.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Display name on the login page.
    pub name: String,
    pub client_id: String,
    pub authorize_url: Url,
    pub token_url: Url,
    /// When set, profile claims come from this endpoint instead of the ID token.
    pub userinfo_url: Option<Url>,
    pub scope: String,
    pub redirect_uri: Url,
}

/// Configuration for a standard OAuth provider (Discord, GitHub).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: Url,
}

/// Complete auth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub oidc: Option<OidcConfig>,
    pub discord: Option<ProviderConfig>,
    pub github: Option<ProviderConfig>,
    /// How long an unfinished sign-in attempt stays usable.
    pub attempt_ttl: Duration,
    /// Upper bound on a single token exchange or userinfo request.
    pub exchange_timeout: Duration,
    pub session_ttl: Duration,
    pub base_url: Url,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_ATTEMPT_TTL_SECS: u64 = 10 * 60;
const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SESSION_TTL_DAYS: u64 = 30;
const MAX_ATTEMPT_TTL_SECS: u64 = 24 * 60 * 60;
const MAX_EXCHANGE_TIMEOUT_SECS: u64 = 5 * 60;
const MAX_SESSION_TTL_DAYS: u64 = 10 * 365;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AUTH_BASE_URL`: Base URL for callback redirects (default: `http://localhost:3000`)
    /// - `OIDC_CLIENT_ID`: enables the custom OIDC provider
    /// - `OIDC_AUTHORIZE_URL`, `OIDC_TOKEN_URL`: required if OIDC is enabled
    /// - `OIDC_USERINFO_URL`: optional userinfo endpoint
    /// - `OIDC_SCOPE`: requested scope (default: `openid email profile`)
    /// - `OIDC_PROVIDER_NAME`: display name (default: `SIMAS-ID`)
    /// - `DISCORD_CLIENT_ID` / `DISCORD_CLIENT_SECRET`: enables Discord
    /// - `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`: enables GitHub
    /// - `AUTH_ATTEMPT_TTL_SECS`: sign-in attempt lifetime (default: 600)
    /// - `AUTH_EXCHANGE_TIMEOUT_SECS`: token request timeout (default: 15)
    /// - `SESSION_TTL_DAYS`: Session TTL in days (default: 30)
    /// - `COOKIE_SECURE`: Whether to set secure flag on cookies (default: true)
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if a URL is invalid or a provider is only
    /// partially configured (e.g., client ID without secret).
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = parse_url(
            "AUTH_BASE_URL",
            &lookup("AUTH_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;

        let oidc = match lookup("OIDC_CLIENT_ID") {
            Some(client_id) => Some(OidcConfig {
                name: lookup("OIDC_PROVIDER_NAME").unwrap_or_else(|| "SIMAS-ID".to_string()),
                client_id,
                authorize_url: parse_url("OIDC_AUTHORIZE_URL", &required(&lookup, "OIDC_AUTHORIZE_URL")?)?,
                token_url: parse_url("OIDC_TOKEN_URL", &required(&lookup, "OIDC_TOKEN_URL")?)?,
                userinfo_url: lookup("OIDC_USERINFO_URL")
                    .map(|u| parse_url("OIDC_USERINFO_URL", &u))
                    .transpose()?,
                scope: lookup("OIDC_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
                redirect_uri: callback_url(&base_url, ProviderKind::CustomOidc)?,
            }),
            None => None,
        };

        let discord = oauth_provider(&lookup, &base_url, ProviderKind::Discord, "DISCORD")?;
        let github = oauth_provider(&lookup, &base_url, ProviderKind::GitHub, "GITHUB")?;

        let attempt_ttl = Duration::from_secs(parse_bounded(
            &lookup,
            "AUTH_ATTEMPT_TTL_SECS",
            DEFAULT_ATTEMPT_TTL_SECS,
            MAX_ATTEMPT_TTL_SECS,
        )?);
        let exchange_timeout = Duration::from_secs(parse_bounded(
            &lookup,
            "AUTH_EXCHANGE_TIMEOUT_SECS",
            DEFAULT_EXCHANGE_TIMEOUT_SECS,
            MAX_EXCHANGE_TIMEOUT_SECS,
        )?);
        let session_ttl_days = parse_bounded(
            &lookup,
            "SESSION_TTL_DAYS",
            DEFAULT_SESSION_TTL_DAYS,
            MAX_SESSION_TTL_DAYS,
        )?;
        let session_ttl = Duration::from_secs(session_ttl_days * SECS_PER_DAY);

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Ok(Self {
            oidc,
            discord,
            github,
            attempt_ttl,
            exchange_timeout,
            session_ttl,
            base_url,
            cookie_name: "session".to_string(),
            cookie_secure,
        })
    }

    /// `attempt_ttl` for timestamp arithmetic.
    pub fn attempt_ttl_delta(&self) -> chrono::Duration {
        to_delta(self.attempt_ttl)
    }

    /// `session_ttl` for timestamp arithmetic.
    pub fn session_ttl_delta(&self) -> chrono::Duration {
        to_delta(self.session_ttl)
    }

    /// Whether any provider is enabled.
    pub fn has_providers(&self) -> bool {
        self.oidc.is_some() || self.discord.is_some() || self.github.is_some()
    }
}

impl OidcConfig {
    /// Configuration pointing at a locally running `MockIdpServer`.
    pub fn for_mock_idp(base_url: &Url, mock_idp_url: &Url, client_id: &str) -> Result<Self, AuthError> {
        let join = |path: &str| {
            mock_idp_url
                .join(path)
                .map_err(|e| AuthError::Config(format!("mock IdP URL: {e}")))
        };

        Ok(Self {
            name: "Mock IdP".to_string(),
            client_id: client_id.to_string(),
            authorize_url: join("/authorize")?,
            token_url: join("/token")?,
            userinfo_url: None,
            scope: DEFAULT_SCOPE.to_string(),
            redirect_uri: callback_url(base_url, ProviderKind::CustomOidc)?,
        })
    }
}

/// `{base_url}/auth/{provider}/callback`
pub fn callback_url(base_url: &Url, provider: ProviderKind) -> Result<Url, AuthError> {
    base_url
        .join(&format!("/auth/{}/callback", provider.slug()))
        .map_err(|e| AuthError::Config(format!("callback URL for {provider}: {e}")))
}

fn oauth_provider<F>(
    lookup: &F,
    base_url: &Url,
    provider: ProviderKind,
    prefix: &str,
) -> Result<Option<ProviderConfig>, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(client_id) = lookup(&format!("{prefix}_CLIENT_ID")) else {
        return Ok(None);
    };
    let secret = required(lookup, &format!("{prefix}_CLIENT_SECRET"))?;

    Ok(Some(ProviderConfig {
        client_id,
        client_secret: SecretString::new(secret),
        redirect_uri: callback_url(base_url, provider)?,
    }))
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| AuthError::Config(format!("{key} must be set")))
}

fn parse_url(key: &str, value: &str) -> Result<Url, AuthError> {
    value
        .parse()
        .map_err(|e| AuthError::Config(format!("{key} must be a valid URL: {e}")))
}

fn parse_bounded<F>(lookup: &F, key: &str, default: u64, max: u64) -> Result<u64, AuthError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| AuthError::Config(format!("{key} must be a whole number, got {raw:?}")))?;

    if value == 0 || value > max {
        return Err(AuthError::Config(format!(
            "{key} must be between 1 and {max}, got {value}"
        )));
    }
    Ok(value)
}

/// Saturates instead of failing; the core time helpers treat the maximum as unbounded.
pub(crate) fn to_delta(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AuthConfig, AuthError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AuthConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_providers() {
        let config = load(&[]).unwrap();

        assert!(!config.has_providers());
        assert_eq!(config.base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.attempt_ttl, Duration::from_secs(600));
        assert_eq!(config.exchange_timeout, Duration::from_secs(15));
        assert_eq!(config.session_ttl, Duration::from_secs(30 * 24 * 60 * 60));
        assert!(config.cookie_secure);
    }

    #[test]
    fn oidc_provider_from_env() {
        let config = load(&[
            ("AUTH_BASE_URL", "https://app.example.com"),
            ("OIDC_CLIENT_ID", "my-client"),
            ("OIDC_AUTHORIZE_URL", "https://login.example.com/v2/oidc/authorize"),
            ("OIDC_TOKEN_URL", "https://api.example.com/v1/oidc/token"),
        ])
        .unwrap();

        let oidc = config.oidc.unwrap();
        assert_eq!(oidc.name, "SIMAS-ID");
        assert_eq!(oidc.scope, "openid email profile");
        assert_eq!(
            oidc.redirect_uri.as_str(),
            "https://app.example.com/auth/oidc/callback"
        );
        assert!(oidc.userinfo_url.is_none());
    }

    #[test]
    fn oidc_without_token_url_is_rejected() {
        let result = load(&[
            ("OIDC_CLIENT_ID", "my-client"),
            ("OIDC_AUTHORIZE_URL", "https://login.example.com/authorize"),
        ]);
        assert!(matches!(result, Err(AuthError::Config(msg)) if msg.contains("OIDC_TOKEN_URL")));
    }

    #[test]
    fn oauth_provider_requires_secret() {
        let result = load(&[("GITHUB_CLIENT_ID", "gh")]);
        assert!(matches!(result, Err(AuthError::Config(msg)) if msg.contains("GITHUB_CLIENT_SECRET")));

        let config = load(&[("GITHUB_CLIENT_ID", "gh"), ("GITHUB_CLIENT_SECRET", "shh")]).unwrap();
        let github = config.github.unwrap();
        assert_eq!(github.client_secret.expose_secret(), "shh");
        assert!(!format!("{github:?}").contains("shh"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            load(&[("AUTH_BASE_URL", "not a url")]),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn timeouts_are_configurable() {
        let config = load(&[
            ("AUTH_ATTEMPT_TTL_SECS", "300"),
            ("AUTH_EXCHANGE_TIMEOUT_SECS", "30"),
            ("COOKIE_SECURE", "false"),
        ])
        .unwrap();
        assert_eq!(config.attempt_ttl, Duration::from_secs(300));
        assert_eq!(config.exchange_timeout, Duration::from_secs(30));
        assert!(!config.cookie_secure);
    }

    #[test]
    fn out_of_range_ttls_are_rejected() {
        for (key, value) in [
            ("SESSION_TTL_DAYS", "18446744073709551615"),
            ("SESSION_TTL_DAYS", "0"),
            ("AUTH_ATTEMPT_TTL_SECS", "9223372036854775808"),
            ("AUTH_EXCHANGE_TIMEOUT_SECS", "86400"),
        ] {
            let result = load(&[(key, value)]);
            assert!(
                matches!(&result, Err(AuthError::Config(msg)) if msg.contains(key)),
                "{key}={value} gave {result:?}"
            );
        }
    }

    #[test]
    fn non_numeric_ttl_is_rejected() {
        assert!(matches!(
            load(&[("AUTH_ATTEMPT_TTL_SECS", "ten minutes")]),
            Err(AuthError::Config(msg)) if msg.contains("AUTH_ATTEMPT_TTL_SECS")
        ));
    }

    #[test]
    fn ttl_deltas_saturate_for_oversized_values() {
        let mut config = load(&[("SESSION_TTL_DAYS", "3650")]).unwrap();
        assert_eq!(config.session_ttl_delta(), chrono::Duration::days(3650));

        config.attempt_ttl = Duration::MAX;
        assert_eq!(config.attempt_ttl_delta(), chrono::Duration::MAX);
    }

    #[test]
    fn mock_idp_config_points_at_mock_endpoints() {
        let base = Url::parse("http://localhost:3000").unwrap();
        let mock = Url::parse("http://localhost:3001").unwrap();
        let oidc = OidcConfig::for_mock_idp(&base, &mock, "signin-dev").unwrap();
        assert_eq!(oidc.authorize_url.as_str(), "http://localhost:3001/authorize");
        assert_eq!(oidc.token_url.as_str(), "http://localhost:3001/token");
    }
}
