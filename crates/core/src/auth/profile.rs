//! Provider claims to `UserIdentity`.
//!
//! Each provider has its own claim shape. The custom OIDC provider does not
//! release an email claim, so an address is synthesized from the username.
//! That placeholder is confined to the custom provider.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{AuthError, ProviderKind, ProviderProfile, Result, UserIdentity};
use crate::serde::{deserialize_optional_string, deserialize_string_or_number};

#[derive(Deserialize)]
struct OidcClaims {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    sub: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

#[derive(Deserialize)]
struct DiscordUser {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Deserialize)]
struct GitHubUser {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    id: Option<String>,
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl ProviderKind {
    /// Normalize this provider's claims into a `UserIdentity`.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteProfile` when the subject identifier is missing or
    /// the claims cannot be read in the provider's shape.
    pub fn map_profile(&self, profile: &ProviderProfile) -> Result<UserIdentity> {
        match self {
            Self::CustomOidc => map_oidc(claims(profile)?),
            Self::Discord => map_discord(claims(profile)?),
            Self::GitHub => map_github(claims(profile)?),
        }
    }
}

fn claims<T: DeserializeOwned>(profile: &ProviderProfile) -> Result<T> {
    serde_json::from_value(profile.clone().into_value())
        .map_err(|e| AuthError::IncompleteProfile(e.to_string()))
}

fn map_oidc(claims: OidcClaims) -> Result<UserIdentity> {
    let id = claims
        .sub
        .ok_or_else(|| AuthError::IncompleteProfile("sub".to_string()))?;
    let name = claims.preferred_username.unwrap_or_default();
    let email = if name.is_empty() {
        String::new()
    } else {
        format!("{name}@gmail.com")
    };

    Ok(UserIdentity {
        id,
        name,
        email,
        image: String::new(),
    })
}

fn map_discord(user: DiscordUser) -> Result<UserIdentity> {
    let id = user
        .id
        .ok_or_else(|| AuthError::IncompleteProfile("id".to_string()))?;
    let image = user
        .avatar
        .map(|hash| format!("https://cdn.discordapp.com/avatars/{id}/{hash}.png"))
        .unwrap_or_default();

    Ok(UserIdentity {
        name: user.global_name.or(user.username).unwrap_or_default(),
        email: user.email.unwrap_or_default(),
        image,
        id,
    })
}

fn map_github(user: GitHubUser) -> Result<UserIdentity> {
    let id = user
        .id
        .ok_or_else(|| AuthError::IncompleteProfile("id".to_string()))?;

    Ok(UserIdentity {
        id,
        name: user.name.or(user.login).unwrap_or_default(),
        email: user.email.unwrap_or_default(),
        image: user.avatar_url.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile(value: serde_json::Value) -> ProviderProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn oidc_maps_sub_and_username() {
        let user = ProviderKind::CustomOidc
            .map_profile(&profile(json!({"sub": "u123", "preferred_username": "alice"})))
            .unwrap();

        assert_eq!(
            user,
            UserIdentity {
                id: "u123".to_string(),
                name: "alice".to_string(),
                email: "alice@gmail.com".to_string(),
                image: String::new(),
            }
        );
    }

    #[test]
    fn oidc_missing_sub_is_incomplete() {
        let result =
            ProviderKind::CustomOidc.map_profile(&profile(json!({"preferred_username": "alice"})));
        assert!(matches!(result, Err(AuthError::IncompleteProfile(claim)) if claim == "sub"));
    }

    #[test]
    fn oidc_empty_sub_is_incomplete() {
        let result = ProviderKind::CustomOidc.map_profile(&profile(json!({"sub": ""})));
        assert!(matches!(result, Err(AuthError::IncompleteProfile(_))));
    }

    #[test]
    fn oidc_missing_username_defaults_to_empty() {
        let user = ProviderKind::CustomOidc
            .map_profile(&profile(json!({"sub": "u123"})))
            .unwrap();
        assert_eq!(user.name, "");
        assert_eq!(user.email, "");
    }

    #[test]
    fn discord_prefers_global_name_and_builds_avatar_url() {
        let user = ProviderKind::Discord
            .map_profile(&profile(json!({
                "id": "80351110224678912",
                "username": "nelly",
                "global_name": "Nelly",
                "email": "nelly@discord.com",
                "avatar": "8342729096ea3675442027381ff50dfe"
            })))
            .unwrap();

        assert_eq!(user.id, "80351110224678912");
        assert_eq!(user.name, "Nelly");
        assert_eq!(user.email, "nelly@discord.com");
        assert_eq!(
            user.image,
            "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png"
        );
    }

    #[test]
    fn github_numeric_id_and_login_fallback() {
        let user = ProviderKind::GitHub
            .map_profile(&profile(json!({
                "id": 583231,
                "login": "octocat",
                "name": null,
                "avatar_url": "https://avatars.githubusercontent.com/u/583231"
            })))
            .unwrap();

        assert_eq!(user.id, "583231");
        assert_eq!(user.name, "octocat");
        assert_eq!(user.email, "");
    }

    #[test]
    fn github_missing_id_is_incomplete() {
        let result = ProviderKind::GitHub.map_profile(&profile(json!({"login": "octocat"})));
        assert!(matches!(result, Err(AuthError::IncompleteProfile(claim)) if claim == "id"));
    }
}
