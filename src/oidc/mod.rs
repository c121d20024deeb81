// ABOUTME: OpenID Connect ID token verification for native and hybrid provider sign-in
// ABOUTME: JWKS cache, validator, and the per-provider validator set built at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Cached signing key sets
pub mod jwks;
/// ID token validator
pub mod validator;

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey};
use tracing::info;

pub use jwks::{JwksCache, RefreshPolicy};
pub use validator::{hash_nonce, IdTokenClaims, IdTokenValidator, KeySource};

use crate::config::{FakeProviderSettings, ProviderSettings, ProvidersConfig};
use crate::constants::{oidc, providers};
use crate::errors::IdTokenError;

/// Apple ID token validator
#[must_use]
pub fn apple_validator(settings: &ProviderSettings) -> IdTokenValidator {
    let url = settings
        .endpoints
        .jwks_url
        .clone()
        .unwrap_or_else(|| oidc::APPLE_JWKS_URL.to_owned());
    IdTokenValidator::new(
        providers::APPLE,
        oidc::APPLE_ISSUER,
        Algorithm::RS256,
        settings.accepted_audiences(),
        KeySource::Jwks(Arc::new(JwksCache::new(url))),
    )
}

/// Google ID token validator
#[must_use]
pub fn google_validator(settings: &ProviderSettings) -> IdTokenValidator {
    let url = settings
        .endpoints
        .jwks_url
        .clone()
        .unwrap_or_else(|| oidc::GOOGLE_JWKS_URL.to_owned());
    IdTokenValidator::new(
        providers::GOOGLE,
        oidc::GOOGLE_ISSUER,
        Algorithm::RS256,
        settings.accepted_audiences(),
        KeySource::Jwks(Arc::new(JwksCache::new(url))),
    )
}

/// Validator for the test provider, which signs with a static HS256 key
#[must_use]
pub fn fake_validator(settings: &FakeProviderSettings) -> IdTokenValidator {
    IdTokenValidator::new(
        providers::FAKE,
        oidc::FAKE_ISSUER,
        Algorithm::HS256,
        vec![settings.audience.clone()],
        KeySource::Static(DecodingKey::from_secret(settings.signing_key.as_bytes())),
    )
}

/// Validators for native ID token sign-in, one per supported provider
#[derive(Debug, Clone, Default)]
pub struct IdTokenValidators {
    /// Apple, shared with the Apple OAuth2 adapter
    pub apple: Option<Arc<IdTokenValidator>>,
    /// Google
    pub google: Option<Arc<IdTokenValidator>>,
    /// Test provider
    pub fake: Option<Arc<IdTokenValidator>>,
}

impl IdTokenValidators {
    /// Build validators for every enabled provider that supports ID tokens
    #[must_use]
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let enabled = |name: &str| config.get(name).filter(|s| s.enabled);
        let validators = Self {
            apple: enabled(providers::APPLE).map(|s| Arc::new(apple_validator(s))),
            google: enabled(providers::GOOGLE).map(|s| Arc::new(google_validator(s))),
            fake: config
                .fake
                .enabled
                .then(|| Arc::new(fake_validator(&config.fake))),
        };
        info!(
            apple = validators.apple.is_some(),
            google = validators.google.is_some(),
            fake = validators.fake.is_some(),
            "ID token validators configured"
        );
        validators
    }

    /// Validator for a provider name
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::UnsupportedProvider`] for unknown or disabled providers
    pub fn get(&self, provider: &str) -> Result<&Arc<IdTokenValidator>, IdTokenError> {
        let validator = match provider {
            providers::APPLE => self.apple.as_ref(),
            providers::GOOGLE => self.google.as_ref(),
            providers::FAKE => self.fake.as_ref(),
            _ => None,
        };
        validator.ok_or_else(|| IdTokenError::UnsupportedProvider(provider.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unknown_and_disabled() {
        let validators = IdTokenValidators::default();
        assert_eq!(
            validators.get("myspace").unwrap_err(),
            IdTokenError::UnsupportedProvider("myspace".to_owned())
        );
        assert!(validators.get(providers::APPLE).is_err());
    }

    #[test]
    fn test_from_config_builds_enabled_only() {
        let config = ProvidersConfig::default()
            .with(providers::GOOGLE, ProviderSettings::enabled("web", "secret"))
            .with(providers::APPLE, ProviderSettings::default());
        let validators = IdTokenValidators::from_config(&config);
        assert!(validators.google.is_some());
        assert!(validators.apple.is_none());
        assert_eq!(validators.get(providers::GOOGLE).unwrap().audiences(), ["web"]);
    }
}
