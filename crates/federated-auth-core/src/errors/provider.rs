// ABOUTME: Structured error types for identity provider adapter operations
// ABOUTME: Wraps exchange and profile failures with the provider name for logging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppError, ErrorCode};
use thiserror::Error;

/// Failure while talking to an external identity provider.
///
/// Every variant names the provider so the log line identifies the upstream,
/// while the API layer can still conceal the detail behind the error code.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// No provider with this name is registered
    #[error("provider '{provider}' is not enabled")]
    NotEnabled {
        /// Requested provider name
        provider: String,
    },

    /// The provider does not implement the requested protocol capability
    #[error("provider '{provider}' does not support {capability}")]
    WrongCapability {
        /// Provider name
        provider: String,
        /// Capability that was requested (`OAuth1`, `OAuth2`)
        capability: &'static str,
    },

    /// Authorization code, request token, or verifier exchange failed
    #[error("{provider}: token exchange failed: {details}")]
    Exchange {
        /// Provider name
        provider: String,
        /// Upstream status or decode error
        details: String,
    },

    /// Profile endpoint call or decode failed
    #[error("{provider}: profile fetch failed: {details}")]
    Profile {
        /// Provider name
        provider: String,
        /// Upstream status or decode error
        details: String,
    },

    /// A field the normalized profile needs is absent from the payload
    #[error("{provider}: missing required field '{field}'")]
    MissingField {
        /// Provider name
        provider: String,
        /// Missing field
        field: String,
    },

    /// Provider configuration is incomplete or unusable
    #[error("{provider}: invalid configuration: {details}")]
    Config {
        /// Provider name
        provider: String,
        /// What is wrong
        details: String,
    },

    /// The provider reported an error on the callback
    #[error("{provider}: {error}")]
    Callback {
        /// Provider name
        provider: String,
        /// `error` query parameter from the provider
        error: String,
    },
}

impl ProviderError {
    /// Exchange failure
    #[must_use]
    pub fn exchange(provider: &str, details: impl Into<String>) -> Self {
        Self::Exchange {
            provider: provider.to_owned(),
            details: details.into(),
        }
    }

    /// Profile failure
    #[must_use]
    pub fn profile(provider: &str, details: impl Into<String>) -> Self {
        Self::Profile {
            provider: provider.to_owned(),
            details: details.into(),
        }
    }

    /// Missing field in the provider payload
    #[must_use]
    pub fn missing_field(provider: &str, field: impl Into<String>) -> Self {
        Self::MissingField {
            provider: provider.to_owned(),
            field: field.into(),
        }
    }

    /// Configuration failure
    #[must_use]
    pub fn config(provider: &str, details: impl Into<String>) -> Self {
        Self::Config {
            provider: provider.to_owned(),
            details: details.into(),
        }
    }

    /// Name of the provider this error concerns
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::NotEnabled { provider }
            | Self::WrongCapability { provider, .. }
            | Self::Exchange { provider, .. }
            | Self::Profile { provider, .. }
            | Self::MissingField { provider, .. }
            | Self::Config { provider, .. }
            | Self::Callback { provider, .. } => provider,
        }
    }

    const fn code(&self) -> ErrorCode {
        match self {
            Self::NotEnabled { .. } => ErrorCode::UnsupportedProvider,
            Self::WrongCapability { .. } => ErrorCode::InternalError,
            Self::Exchange { .. } | Self::Callback { .. } => ErrorCode::ExternalAuthFailed,
            Self::Profile { .. } | Self::MissingField { .. } => ErrorCode::ExternalServiceError,
            Self::Config { .. } => ErrorCode::ConfigInvalid,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        let provider = error.provider().to_owned();
        Self::new(error.code(), error.to_string()).with_provider(provider)
    }
}

#[cfg(feature = "provider-errors")]
impl ProviderError {
    /// Classify a transport error from the HTTP client
    #[must_use]
    pub fn from_reqwest(provider: &str, stage: ProviderStage, error: &reqwest::Error) -> Self {
        let details = if error.is_timeout() {
            "request timed out".to_owned()
        } else if let Some(status) = error.status() {
            format!("upstream returned {status}")
        } else {
            error.to_string()
        };
        match stage {
            ProviderStage::Exchange => Self::exchange(provider, details),
            ProviderStage::Profile => Self::profile(provider, details),
        }
    }
}

/// Which leg of the provider dance failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStage {
    /// Code or verifier exchange
    Exchange,
    /// Profile fetch
    Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_provider_context() {
        let app: AppError = ProviderError::missing_field("twitch", "data").into();
        assert_eq!(app.code, ErrorCode::ExternalServiceError);
        assert_eq!(app.context.provider.as_deref(), Some("twitch"));
        assert!(app.message.contains("data"));
    }

    #[test]
    fn test_not_enabled_maps_to_unsupported_provider() {
        let app: AppError = ProviderError::NotEnabled {
            provider: "myspace".to_owned(),
        }
        .into();
        assert_eq!(app.code, ErrorCode::UnsupportedProvider);
    }
}
