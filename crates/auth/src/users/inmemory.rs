//! In-memory user storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use signin_core::auth::{
    AccountTokens, AuthError, LinkedAccount, ProviderKind, Result, UserIdentity, UserRepository,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, UserIdentity>,
    accounts: HashMap<(ProviderKind, String), LinkedAccount>,
}

/// In-memory user store for development and testing.
///
/// Users and account links live behind one lock so that resolving a
/// provider account and creating its user happen as a single step.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    inner: Arc<RwLock<Inner>>,
}

impl UserStore {
    /// Creates a new empty in-memory user store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_or_create_user(
        &self,
        provider: ProviderKind,
        subject: &str,
        profile: &UserIdentity,
    ) -> Result<UserIdentity> {
        let mut inner = self.inner.write().await;
        let key = (provider, subject.to_string());

        if let Some(account) = inner.accounts.get(&key) {
            return inner
                .users
                .get(&account.user_id)
                .cloned()
                .ok_or_else(|| {
                    AuthError::Storage(format!("dangling account link to {}", account.user_id))
                });
        }

        let user = UserIdentity {
            id: Uuid::new_v4().to_string(),
            ..profile.clone()
        };
        inner.users.insert(user.id.clone(), user.clone());
        inner
            .accounts
            .insert(key, unlinked(&user.id, provider, subject));

        Ok(user)
    }

    async fn link_account(
        &self,
        user_id: &str,
        provider: ProviderKind,
        subject: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(user_id) {
            return Err(AuthError::Storage(format!("unknown user {user_id}")));
        }

        match inner.accounts.get(&(provider, subject.to_string())) {
            Some(existing) if existing.user_id == user_id => Ok(()),
            Some(_) => Err(AuthError::Storage(format!(
                "{provider} account is linked to another user"
            ))),
            None => {
                inner.accounts.insert(
                    (provider, subject.to_string()),
                    unlinked(user_id, provider, subject),
                );
                Ok(())
            }
        }
    }

    async fn save_account_tokens(
        &self,
        provider: ProviderKind,
        subject: &str,
        tokens: &AccountTokens,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(&(provider, subject.to_string()))
            .ok_or_else(|| AuthError::Storage(format!("{provider} account is not linked")))?;
        account.tokens = Some(tokens.clone());
        Ok(())
    }

    async fn get_account(
        &self,
        provider: ProviderKind,
        subject: &str,
    ) -> Result<Option<LinkedAccount>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.get(&(provider, subject.to_string())).cloned())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserIdentity>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(id).cloned())
    }
}

fn unlinked(user_id: &str, provider: ProviderKind, subject: &str) -> LinkedAccount {
    LinkedAccount {
        user_id: user_id.to_string(),
        provider,
        subject: subject.to_string(),
        tokens: None,
    }
}
