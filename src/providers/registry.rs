// ABOUTME: Read-only registry of enabled identity providers, built once at startup
// ABOUTME: Instantiates each adapter from its descriptor and configured credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use tracing::info;

use super::apple::AppleProvider;
use super::bitbucket::BitbucketProvider;
use super::core::{OAuth2Provider, Provider};
use super::discord::DiscordProvider;
use super::facebook::FacebookProvider;
use super::github::GithubProvider;
use super::gitlab::GitlabProvider;
use super::google::GoogleProvider;
use super::linkedin::LinkedinProvider;
use super::microsoft::MicrosoftProvider;
use super::oauth2::OAuth2Client;
use super::spi::{descriptor, ProviderDescriptor};
use super::spotify::SpotifyProvider;
use super::strava::StravaProvider;
use super::twitch::TwitchProvider;
use super::twitter::TwitterProvider;
use super::windowslive::WindowsLiveProvider;
use super::workos::WorkosProvider;
use crate::config::{ProviderSettings, ServerConfig};
use crate::constants::{paths, providers};
use crate::errors::{AppResult, ProviderError};
use crate::oidc::IdTokenValidators;

/// Callback URL for a provider under the public server URL
#[must_use]
pub fn callback_url(server_url: &str, provider: &str) -> String {
    format!(
        "{}{}",
        server_url.trim_end_matches('/'),
        paths::PROVIDER_CALLBACK.replace("{provider}", provider)
    )
}

/// Enabled providers by name
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    /// Build every enabled provider
    ///
    /// Apple shares its ID token validator with native Apple sign-in, so the
    /// validator set must be built from the same configuration first.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown provider name or unusable
    /// provider settings
    pub fn from_config(config: &ServerConfig, validators: &IdTokenValidators) -> AppResult<Self> {
        let mut registry = Self::default();
        for (name, settings) in config.providers.enabled() {
            let provider = build_provider(name, settings, &config.server_url, validators)?;
            registry.providers.insert(name.to_owned(), provider);
        }
        info!(
            providers = ?registry.names(),
            "Identity provider registry initialized"
        );
        Ok(registry)
    }

    /// Build a registry from already constructed providers
    #[must_use]
    pub fn from_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.name().to_owned(), p))
                .collect(),
        }
    }

    /// Look up a provider
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotEnabled`] when no provider with this name is registered
    pub fn get(&self, name: &str) -> Result<&Provider, ProviderError> {
        self.providers
            .get(name)
            .ok_or_else(|| ProviderError::NotEnabled {
                provider: name.to_owned(),
            })
    }

    /// Registered provider names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Registered providers, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn build_provider(
    name: &str,
    settings: &ProviderSettings,
    server_url: &str,
    validators: &IdTokenValidators,
) -> AppResult<Provider> {
    let descriptor: &'static ProviderDescriptor =
        descriptor(name).ok_or_else(|| ProviderError::config(name, "unknown provider"))?;
    let redirect = callback_url(server_url, name);

    if name == providers::TWITTER {
        let twitter = TwitterProvider::new(descriptor, settings, redirect)?;
        return Ok(Provider::OAuth1(Box::new(twitter)));
    }

    let client = OAuth2Client::new(descriptor, settings, redirect);
    let provider: Box<dyn OAuth2Provider> = match name {
        providers::APPLE => {
            let signing = settings
                .apple
                .as_ref()
                .ok_or_else(|| ProviderError::config(name, "missing signing settings"))?;
            let validator = validators
                .apple
                .clone()
                .ok_or_else(|| ProviderError::config(name, "missing ID token validator"))?;
            Box::new(AppleProvider::new(client, signing, validator)?)
        }
        providers::AZUREAD => Box::new(MicrosoftProvider::azuread(client)),
        providers::BITBUCKET => Box::new(BitbucketProvider::new(client)),
        providers::DISCORD => Box::new(DiscordProvider::new(client)),
        providers::ENTRAID => Box::new(MicrosoftProvider::entraid(client)),
        providers::FACEBOOK => Box::new(FacebookProvider::new(client)),
        providers::GITHUB => Box::new(GithubProvider::new(client)),
        providers::GITLAB => Box::new(GitlabProvider::new(client)),
        providers::GOOGLE => Box::new(GoogleProvider::new(client)),
        providers::LINKEDIN => Box::new(LinkedinProvider::new(client)),
        providers::SPOTIFY => Box::new(SpotifyProvider::new(client)),
        providers::STRAVA => Box::new(StravaProvider::new(client)),
        providers::TWITCH => Box::new(TwitchProvider::new(client)),
        providers::WINDOWSLIVE => Box::new(WindowsLiveProvider::new(client)),
        providers::WORKOS => Box::new(WorkosProvider::new(client, settings.workos.clone())),
        other => return Err(ProviderError::config(other, "no adapter for provider").into()),
    };
    Ok(Provider::OAuth2(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_url_trims_trailing_slash() {
        assert_eq!(
            callback_url("https://auth.myapp.local/v1/", "github"),
            "https://auth.myapp.local/v1/signin/provider/github/callback"
        );
    }

    #[test]
    fn test_unknown_name_is_not_enabled() {
        let registry = ProviderRegistry::default();
        let err = registry.get("myspace").unwrap_err();
        assert!(matches!(err, ProviderError::NotEnabled { .. }));
        assert!(registry.is_empty());
    }
}
