use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserIdentity;

/// User portion of the session handed to the rest of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Session view derived from the persisted user on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    pub expiry: DateTime<Utc>,
}

impl Session {
    /// The default session shape for a user: profile fields, no id.
    pub fn for_user(user: &UserIdentity, expiry: DateTime<Utc>) -> Self {
        Self {
            user: SessionUser {
                id: None,
                name: non_empty(&user.name),
                email: non_empty(&user.email),
                image: non_empty(&user.image),
            },
            expiry,
        }
    }
}

/// Attach the resolved user id to a session.
///
/// Returns a new session; every other field is carried over from `session`.
pub fn bind_session(session: &Session, user: &UserIdentity) -> Session {
    Session {
        user: SessionUser {
            id: Some(user.id.clone()),
            ..session.user.clone()
        },
        expiry: session.expiry,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
