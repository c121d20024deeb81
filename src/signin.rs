// ABOUTME: Provider sign-in orchestration from the redirect to a normalized profile
// ABOUTME: Drives OAuth1 and OAuth2 callbacks, native ID-token sign-in and user resolution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sign-in flow
//!
//! [`SignInFlow::start`] signs the flow state and asks the provider for a
//! redirect URL. The provider later calls back with either an error, which
//! becomes a [`ProviderCallbackError`] the caller redirects with, or the
//! material needed to fetch the user's [`Profile`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult, ProviderError};
use crate::jwt::JwtGetter;
use crate::logging::AuthLogger;
use crate::models::{Profile, User};
use crate::oidc::IdTokenValidators;
use crate::providers::{Provider, ProviderRegistry, ProviderSpecificParams};
use crate::state::SignedState;
use crate::users::UsersStore;

/// Query or form parameters of a provider callback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    /// Signed state issued by [`SignInFlow::start`]
    #[serde(default)]
    pub state: String,
    /// `OAuth2` authorization code
    #[serde(default)]
    pub code: Option<String>,
    /// ID token delivered alongside the code
    #[serde(default)]
    pub id_token: Option<String>,
    /// `OAuth1` request token
    #[serde(default)]
    pub oauth_token: Option<String>,
    /// `OAuth1` verifier
    #[serde(default)]
    pub oauth_verifier: Option<String>,
    /// Error code reported by the provider
    #[serde(default)]
    pub error: Option<String>,
    /// Error description reported by the provider
    #[serde(default)]
    pub error_description: Option<String>,
    /// Error page reported by the provider
    #[serde(default)]
    pub error_uri: Option<String>,
    /// Everything else, such as Apple's `user` form field
    #[serde(flatten)]
    pub extras: HashMap<String, String>,
}

/// The provider refused the sign-in
#[derive(Debug)]
pub struct ProviderCallbackError {
    /// Provider and error code
    pub error: ProviderError,
    /// Client URL carrying `provider_error` and `provider_error_description`
    pub redirect_to: String,
}

/// A completed provider sign-in
#[derive(Debug, Clone)]
pub struct SignInResult {
    /// Provider name
    pub provider: String,
    /// Normalized profile
    pub profile: Profile,
    /// Decoded flow state
    pub state: SignedState,
    /// User linking this provider, when the flow started from a session
    pub connect_user: Option<Uuid>,
    /// Where the client should land
    pub redirect_to: String,
}

/// Result of a provider callback
#[derive(Debug)]
pub enum CallbackOutcome {
    /// The user authenticated with the provider
    SignedIn(SignInResult),
    /// The provider reported an error
    ProviderRejected(ProviderCallbackError),
}

/// Orchestrates provider sign-in
#[derive(Debug)]
pub struct SignInFlow {
    registry: ProviderRegistry,
    validators: IdTokenValidators,
    jwt: JwtGetter,
    client_url: String,
}

impl SignInFlow {
    /// Assemble a flow from its parts
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        validators: IdTokenValidators,
        jwt: JwtGetter,
        client_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            validators,
            jwt,
            client_url: client_url.into(),
        }
    }

    /// Build validators and the provider registry from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when an enabled provider cannot be built
    pub fn from_config(config: &ServerConfig, jwt: JwtGetter) -> AppResult<Self> {
        let validators = IdTokenValidators::from_config(&config.providers);
        let registry = ProviderRegistry::from_config(config, &validators)?;
        Ok(Self::new(registry, validators, jwt, config.client_url.clone()))
    }

    /// Enabled providers
    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Redirect URL that starts a sign-in with `provider`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` for a disabled provider, or the
    /// provider's error when the request-token step fails
    pub async fn start(
        &self,
        provider: &str,
        state: &SignedState,
        params: &ProviderSpecificParams,
    ) -> AppResult<String> {
        let provider = self.registry.get(provider)?;
        let encoded = state.encode(&self.jwt)?;
        let url = match provider {
            Provider::OAuth2(p) => p.auth_code_url(&encoded, params)?,
            Provider::OAuth1(p) => p.auth_code_url(&encoded).await?,
        };
        debug!(provider = provider.name(), "Starting provider sign-in");
        Ok(url)
    }

    /// Complete a sign-in from the provider's callback
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` for a disabled provider, `AuthInvalid`
    /// or `AuthExpired` for a bad state or connect token, and provider
    /// errors when the exchange or profile fetch fails
    pub async fn callback(
        &self,
        provider_name: &str,
        params: CallbackParams,
    ) -> AppResult<CallbackOutcome> {
        let provider = self.registry.get(provider_name)?;

        let state = SignedState::decode(&self.jwt, &params.state).map_err(|e| {
            AuthLogger::log_signin_event(provider_name, "state", false, Some(&e.message));
            e
        })?;
        let redirect_to = state
            .options
            .redirect_to
            .clone()
            .unwrap_or_else(|| self.client_url.clone());

        if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
            AuthLogger::log_signin_event(provider_name, "callback", false, Some(error));
            let redirect_to = provider_error_redirect(&redirect_to, &params)?;
            return Ok(CallbackOutcome::ProviderRejected(ProviderCallbackError {
                error: ProviderError::Callback {
                    provider: provider_name.to_owned(),
                    error: error.to_owned(),
                },
                redirect_to,
            }));
        }

        let profile = self
            .fetch_profile(provider, &params)
            .await
            .map_err(|e| {
                AuthLogger::log_signin_event(provider_name, "profile", false, Some(&e.message));
                e
            })?;
        if profile.provider_user_id.is_empty() {
            AuthLogger::log_signin_event(provider_name, "profile", false, Some("empty user id"));
            return Err(ProviderError::missing_field(provider_name, "provider_user_id").into());
        }

        let connect_user = match state.connect.as_deref() {
            Some(token) => Some(self.jwt.validate(token)?.user_id()?),
            None => None,
        };

        AuthLogger::log_signin_event(provider_name, "callback", true, None);
        Ok(CallbackOutcome::SignedIn(SignInResult {
            provider: provider_name.to_owned(),
            profile,
            state,
            connect_user,
            redirect_to,
        }))
    }

    async fn fetch_profile(&self, provider: &Provider, params: &CallbackParams) -> AppResult<Profile> {
        match provider {
            Provider::OAuth1(p) => {
                let token = p
                    .access_token(
                        params.oauth_token.as_deref().unwrap_or_default(),
                        params.oauth_verifier.as_deref().unwrap_or_default(),
                    )
                    .await?;
                p.get_profile(&token.token, &token.token_secret).await
            }
            Provider::OAuth2(p) => {
                let code = params.code.as_deref().unwrap_or_default();
                if code.is_empty() {
                    return Err(AppError::invalid_input("missing authorization code"));
                }
                let token = p.exchange(code).await?;
                let id_token = params.id_token.as_deref().or(token.id_token.as_deref());
                p.get_profile(&token.access_token, id_token, &params.extras)
                    .await
            }
        }
    }

    /// Verify an ID token obtained natively by the client
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` for providers without a validator and
    /// `AuthInvalid` or `AuthExpired` when verification fails
    pub async fn sign_in_id_token(
        &self,
        provider: &str,
        id_token: &str,
        nonce: &str,
    ) -> AppResult<Profile> {
        let validator = self.validators.get(provider)?;
        let claims = validator.validate(id_token, nonce).await.map_err(|e| {
            AuthLogger::log_signin_event(provider, "id_token", false, Some(&e.to_string()));
            e
        })?;
        let profile = claims.to_profile()?;
        if profile.provider_user_id.is_empty() {
            return Err(AppError::auth_invalid("id token has no subject").with_provider(provider));
        }
        AuthLogger::log_signin_event(provider, "id_token", true, None);
        Ok(profile)
    }

    /// Find or create the user a completed sign-in belongs to
    ///
    /// Connect flows link the provider to the session's user. Otherwise an
    /// existing link wins, then a user with the same verified email is
    /// linked, and finally a new user is created.
    ///
    /// # Errors
    ///
    /// Returns not-found when the connecting user no longer exists, or any
    /// store error
    pub async fn resolve_user(
        &self,
        users: &dyn UsersStore,
        result: &SignInResult,
    ) -> AppResult<User> {
        let provider = result.provider.as_str();
        let profile = &result.profile;

        if let Some(user_id) = result.connect_user {
            let user = users
                .get_user(user_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
            users
                .insert_user_provider(user_id, provider, &profile.provider_user_id)
                .await?;
            info!(user_id = %user_id, provider, "Linked provider to existing user");
            return Ok(user);
        }

        if let Some(user) = users
            .find_by_provider(provider, &profile.provider_user_id)
            .await?
        {
            return Ok(user);
        }

        if profile.email_verified {
            if let Some(user) = users.find_by_email(&profile.email).await? {
                users
                    .insert_user_provider(user.id, provider, &profile.provider_user_id)
                    .await?;
                info!(user_id = %user.id, provider, "Linked provider by verified email");
                return Ok(user);
            }
        } else if !profile.email.is_empty() {
            warn!(provider, "Provider email is unverified, not linking by email");
        }

        users
            .insert_user_with_provider(profile, provider, &result.state.options)
            .await
    }
}

fn provider_error_redirect(base: &str, params: &CallbackParams) -> AppResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| AppError::config(format!("invalid redirect URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("provider_error", params.error.as_deref().unwrap_or_default())
        .append_pair(
            "provider_error_description",
            params.error_description.as_deref().unwrap_or_default(),
        )
        .append_pair(
            "provider_error_url",
            params.error_uri.as_deref().unwrap_or_default(),
        );
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_redirect_keeps_existing_query() {
        let params = CallbackParams {
            error: Some("access_denied".to_owned()),
            error_description: Some("The user denied access".to_owned()),
            ..CallbackParams::default()
        };
        let url = provider_error_redirect("https://myapp.local/welcome?tab=1", &params).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["tab"], "1");
        assert_eq!(pairs["provider_error"], "access_denied");
        assert_eq!(pairs["provider_error_description"], "The user denied access");
    }

    #[test]
    fn test_callback_params_collect_extras() {
        let params: CallbackParams = serde_urlencoded::from_str(
            "state=s&code=c&user=%7B%22name%22%3A%7B%7D%7D",
        )
        .unwrap();
        assert_eq!(params.code.as_deref(), Some("c"));
        assert_eq!(params.extras.get("user").map(String::as_str), Some("{\"name\":{}}"));
        assert!(!params.extras.contains_key("state"));
    }
}
