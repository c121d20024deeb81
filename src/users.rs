// ABOUTME: User persistence capability consumed by the sign-in flow and the elevated-claim policy
// ABOUTME: Async trait plus a concurrent in-memory implementation for single-process use and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Profile, SignUpOptions, User};

/// Default role given to users created through a provider sign-in
pub const DEFAULT_USER_ROLE: &str = "user";

/// Persistence operations the authentication core depends on
#[async_trait]
pub trait UsersStore: Send + Sync {
    /// Look up a user by id
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Look up the user linked to a provider identity
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> AppResult<Option<User>>;

    /// Look up a user by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Create a user from a provider profile and link the provider identity
    async fn insert_user_with_provider(
        &self,
        profile: &Profile,
        provider: &str,
        options: &SignUpOptions,
    ) -> AppResult<User>;

    /// Link a provider identity to an existing user
    async fn insert_user_provider(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
    ) -> AppResult<()>;

    /// Number of hardware security keys the user registered
    async fn count_security_keys(&self, user_id: Uuid) -> AppResult<u64>;
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    email: String,
    security_keys: u64,
}

/// In-memory [`UsersStore`]
#[derive(Debug, Default)]
pub struct MemoryUsersStore {
    users: DashMap<Uuid, StoredUser>,
    providers: DashMap<(String, String), Uuid>,
}

impl MemoryUsersStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with an email address
    pub fn add_user(&self, user: User, email: impl Into<String>) {
        self.users.insert(
            user.id,
            StoredUser {
                user,
                email: email.into(),
                security_keys: 0,
            },
        );
    }

    /// Record a registered security key
    ///
    /// # Errors
    ///
    /// Returns not-found when the user does not exist
    pub fn add_security_key(&self, user_id: Uuid) -> AppResult<()> {
        let mut entry = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
        entry.security_keys += 1;
        Ok(())
    }

    /// Number of stored users
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the store holds no users
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UsersStore for MemoryUsersStore {
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.user.clone()))
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> AppResult<Option<User>> {
        let key = (provider.to_owned(), provider_user_id.to_owned());
        let Some(user_id) = self.providers.get(&key).map(|id| *id) else {
            return Ok(None);
        };
        self.get_user(user_id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        if email.is_empty() {
            return Ok(None);
        }
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.user.clone()))
    }

    async fn insert_user_with_provider(
        &self,
        profile: &Profile,
        provider: &str,
        options: &SignUpOptions,
    ) -> AppResult<User> {
        let default_role = options
            .default_role
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_ROLE.to_owned());
        let mut allowed_roles = options
            .allowed_roles
            .clone()
            .unwrap_or_else(|| vec![default_role.clone()]);
        if !allowed_roles.contains(&default_role) {
            allowed_roles.push(default_role.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            allowed_roles,
            default_role,
            is_anonymous: false,
        };
        self.add_user(user.clone(), profile.email.clone());
        self.insert_user_provider(user.id, provider, &profile.provider_user_id)
            .await?;
        debug!(user_id = %user.id, provider = %provider, "Inserted user from provider profile");
        Ok(user)
    }

    async fn insert_user_provider(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
    ) -> AppResult<()> {
        if !self.users.contains_key(&user_id) {
            return Err(AppError::not_found(format!("user {user_id}")));
        }
        self.providers
            .insert((provider.to_owned(), provider_user_id.to_owned()), user_id);
        Ok(())
    }

    async fn count_security_keys(&self, user_id: Uuid) -> AppResult<u64> {
        Ok(self.users.get(&user_id).map_or(0, |u| u.security_keys))
    }
}
