// ABOUTME: Identity provider configuration loaded from AUTH_PROVIDER_* environment variables
// ABOUTME: Credentials, scopes, tenant, Apple signing material, WorkOS defaults and endpoint overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use super::environment::{env_bool, env_opt, env_var_or, parse_scopes};
use crate::constants::{oidc, providers};
use crate::errors::{AppError, AppResult};

/// Apple client-secret signing material
#[derive(Debug, Clone, Default)]
pub struct AppleSigningSettings {
    /// Developer team id, used as the client secret issuer
    pub team_id: String,
    /// Key id placed in the client secret header
    pub key_id: String,
    /// PKCS#8 PEM private key (P-256)
    pub private_key: String,
}

/// `WorkOS` SSO defaults applied when the sign-in request names none
#[derive(Debug, Clone, Default)]
pub struct WorkosDefaults {
    /// Default organization id
    pub organization: Option<String>,
    /// Default connection id
    pub connection: Option<String>,
    /// Default domain
    pub domain: Option<String>,
}

/// Endpoint overrides, for self-hosted instances and test doubles
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    /// Authorization (or `OAuth1` authorize) endpoint
    pub auth_url: Option<String>,
    /// Token (or `OAuth1` access token) endpoint
    pub token_url: Option<String>,
    /// `OAuth1` request token endpoint
    pub request_token_url: Option<String>,
    /// Base URL for profile calls
    pub api_base_url: Option<String>,
    /// Key set endpoint for ID token validation
    pub jwks_url: Option<String>,
}

/// Settings for one identity provider
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Whether the provider is registered at startup
    pub enabled: bool,
    /// OAuth client id (`OAuth1` consumer key)
    pub client_id: String,
    /// OAuth client secret (`OAuth1` consumer secret)
    pub client_secret: String,
    /// Requested scopes; empty means the provider's default set
    pub scopes: Vec<String>,
    /// Tenant for Azure AD and Entra ID
    pub tenant: Option<String>,
    /// Apple client secret signing material
    pub apple: Option<AppleSigningSettings>,
    /// `WorkOS` defaults
    pub workos: WorkosDefaults,
    /// Extra audiences accepted on native ID tokens
    pub audiences: Vec<String>,
    /// Endpoint overrides
    pub endpoints: EndpointOverrides,
}

impl ProviderSettings {
    /// Enabled settings with credentials, as used by tests and the CLI
    #[must_use]
    pub fn enabled(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            enabled: true,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Accepted ID token audiences: the client id followed by any extras
    #[must_use]
    pub fn accepted_audiences(&self) -> Vec<String> {
        std::iter::once(self.client_id.clone())
            .chain(self.audiences.iter().cloned())
            .filter(|a| !a.is_empty())
            .collect()
    }

    fn from_env(name: &str) -> AppResult<Self> {
        let prefix = format!("AUTH_PROVIDER_{}", name.to_uppercase());
        let var = |suffix: &str| env_opt(&format!("{prefix}_{suffix}"));

        let apple = if name == providers::APPLE {
            Some(AppleSigningSettings {
                team_id: var("TEAM_ID").unwrap_or_default(),
                key_id: var("KEY_ID").unwrap_or_default(),
                private_key: var("PRIVATE_KEY")
                    .map(|k| k.replace("\\n", "\n"))
                    .unwrap_or_default(),
            })
        } else {
            None
        };

        let tenant = if name == providers::AZUREAD || name == providers::ENTRAID {
            Some(env_var_or(&format!("{prefix}_TENANT"), "common"))
        } else {
            None
        };

        Ok(Self {
            enabled: env_bool(&format!("{prefix}_ENABLED"), false)?,
            client_id: var("CLIENT_ID").unwrap_or_default(),
            client_secret: var("CLIENT_SECRET").unwrap_or_default(),
            scopes: var("SCOPE").map(|s| parse_scopes(&s)).unwrap_or_default(),
            tenant,
            apple,
            workos: WorkosDefaults {
                organization: var("DEFAULT_ORGANIZATION"),
                connection: var("DEFAULT_CONNECTION"),
                domain: var("DEFAULT_DOMAIN"),
            },
            audiences: var("AUDIENCE").map(|s| parse_scopes(&s)).unwrap_or_default(),
            endpoints: EndpointOverrides {
                auth_url: var("AUTH_URL"),
                token_url: var("TOKEN_URL"),
                request_token_url: var("REQUEST_TOKEN_URL"),
                api_base_url: var("API_BASE_URL"),
                jwks_url: var("JWKS_URL"),
            },
        })
    }

    fn validate(&self, name: &str) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.client_id.is_empty() {
            return Err(AppError::config(format!("provider '{name}' is enabled without a client id"))
                .with_provider(name));
        }
        match &self.apple {
            Some(apple) => {
                if apple.team_id.is_empty() || apple.key_id.is_empty() || apple.private_key.is_empty()
                {
                    return Err(AppError::config(
                        "apple requires AUTH_PROVIDER_APPLE_TEAM_ID, _KEY_ID and _PRIVATE_KEY",
                    )
                    .with_provider(name));
                }
            }
            None if self.client_secret.is_empty() => {
                return Err(AppError::config(format!(
                    "provider '{name}' is enabled without a client secret"
                ))
                .with_provider(name));
            }
            None => {}
        }
        Ok(())
    }
}

/// Settings for the test provider that signs ID tokens with a static key
#[derive(Debug, Clone)]
pub struct FakeProviderSettings {
    /// Whether native ID token sign-in accepts the test provider
    pub enabled: bool,
    /// HS256 signing key
    pub signing_key: String,
    /// Accepted audience
    pub audience: String,
}

impl Default for FakeProviderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            signing_key: String::new(),
            audience: oidc::FAKE_AUDIENCE.to_owned(),
        }
    }
}

/// Settings for every known provider, keyed by provider name
#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    providers: BTreeMap<String, ProviderSettings>,
    /// Test provider for native ID token sign-in
    pub fake: FakeProviderSettings,
}

impl ProvidersConfig {
    /// Load every known provider from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean flag is unparseable
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        for name in providers::ALL_OAUTH_PROVIDERS {
            config.insert(name, ProviderSettings::from_env(name)?);
        }
        config.fake = FakeProviderSettings {
            enabled: env_bool("AUTH_PROVIDER_FAKE_ENABLED", false)?,
            signing_key: env_opt("AUTH_PROVIDER_FAKE_SIGNING_KEY").unwrap_or_default(),
            audience: env_var_or("AUTH_PROVIDER_FAKE_AUDIENCE", oidc::FAKE_AUDIENCE),
        };
        Ok(config)
    }

    /// Add or replace the settings for a provider
    pub fn insert(&mut self, name: &str, settings: ProviderSettings) {
        self.providers.insert(name.to_owned(), settings);
    }

    /// Builder-style [`ProvidersConfig::insert`]
    #[must_use]
    pub fn with(mut self, name: &str, settings: ProviderSettings) -> Self {
        self.insert(name, settings);
        self
    }

    /// Settings for one provider, enabled or not
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.get(name)
    }

    /// Enabled providers in name order
    pub fn enabled(&self) -> impl Iterator<Item = (&str, &ProviderSettings)> {
        self.providers
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(n, s)| (n.as_str(), s))
    }

    /// Names of enabled providers
    #[must_use]
    pub fn enabled_names(&self) -> Vec<&str> {
        self.enabled().map(|(n, _)| n).collect()
    }

    /// Check credentials of every enabled provider
    ///
    /// # Errors
    ///
    /// Returns a config error naming the first incomplete provider
    pub fn validate(&self) -> AppResult<()> {
        for (name, settings) in &self.providers {
            settings.validate(name)?;
        }
        if self.fake.enabled && self.fake.signing_key.is_empty() {
            return Err(AppError::config(
                "AUTH_PROVIDER_FAKE_ENABLED requires AUTH_PROVIDER_FAKE_SIGNING_KEY",
            )
            .with_provider(providers::FAKE));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_audiences_include_client_id_first() {
        let mut settings = ProviderSettings::enabled("web-client", "secret");
        settings.audiences = vec!["ios-client".to_owned(), "android-client".to_owned()];
        assert_eq!(
            settings.accepted_audiences(),
            vec!["web-client", "ios-client", "android-client"]
        );
    }

    #[test]
    fn test_enabled_provider_requires_secret() {
        let config =
            ProvidersConfig::default().with(providers::GITHUB, ProviderSettings::enabled("id", ""));
        let err = config.validate().unwrap_err();
        assert_eq!(err.context.provider.as_deref(), Some(providers::GITHUB));
    }

    #[test]
    fn test_disabled_provider_is_not_validated() {
        let config = ProvidersConfig::default().with(providers::GITHUB, ProviderSettings::default());
        assert!(config.validate().is_ok());
        assert!(config.enabled_names().is_empty());
    }

    #[test]
    fn test_apple_requires_signing_material() {
        let mut settings = ProviderSettings::enabled("com.example.app", "");
        settings.apple = Some(AppleSigningSettings::default());
        let config = ProvidersConfig::default().with(providers::APPLE, settings);
        assert!(config.validate().is_err());
    }
}
