// ABOUTME: Capability traits for OAuth1 and OAuth2 identity providers and the Provider sum type
// ABOUTME: Call sites branch once on the protocol and then use the matching capability
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::oauth2::{OAuth2Client, OAuth2Token};
use crate::errors::{AppResult, ProviderError};
use crate::models::Profile;

/// Parameters a sign-in request may pass through to the provider
///
/// Only `WorkOS` reads them today; other providers ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpecificParams {
    /// SSO connection id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    /// Organization id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Email domain used to pick the connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// `OAuth2` authorization-code capability
#[async_trait]
pub trait OAuth2Provider: Send + Sync {
    /// Shared authorization-code client
    fn client(&self) -> &OAuth2Client;

    /// Registry name
    fn name(&self) -> &'static str {
        self.client().name()
    }

    /// Authorization redirect URL for a signed state
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the authorization endpoint is invalid
    fn auth_code_url(&self, state: &str, _params: &ProviderSpecificParams) -> AppResult<String> {
        self.client().auth_code_url(state, &[])
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an exchange error when the provider rejects the code
    async fn exchange(&self, code: &str) -> AppResult<OAuth2Token> {
        self.client().exchange(code).await
    }

    /// Fetch and normalize the user's profile
    ///
    /// `id_token` is set for hybrid flows that deliver an ID token alongside
    /// the code; `extra` carries any other callback parameters.
    ///
    /// # Errors
    ///
    /// Returns a profile error on transport, status or decode failure
    async fn get_profile(
        &self,
        access_token: &str,
        id_token: Option<&str>,
        extra: &HashMap<String, String>,
    ) -> AppResult<Profile>;
}

/// Token pair issued by an `OAuth1` access-token exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth1Token {
    /// `oauth_token`
    pub token: String,
    /// `oauth_token_secret`
    pub token_secret: String,
}

/// `OAuth1` request-token capability
#[async_trait]
pub trait OAuth1Provider: Send + Sync {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Obtain a request token and return the authorize URL carrying it
    ///
    /// # Errors
    ///
    /// Returns an exchange error when the request-token step fails
    async fn auth_code_url(&self, state: &str) -> AppResult<String>;

    /// Exchange a request token and verifier for an access token
    ///
    /// # Errors
    ///
    /// Returns an exchange error when the provider rejects the verifier
    async fn access_token(&self, request_token: &str, verifier: &str) -> AppResult<OAuth1Token>;

    /// Fetch and normalize the user's profile with a signed request
    ///
    /// # Errors
    ///
    /// Returns a profile error on transport, status or decode failure
    async fn get_profile(&self, token: &str, token_secret: &str) -> AppResult<Profile>;
}

/// A registered provider: exactly one of the two protocol capabilities
pub enum Provider {
    /// `OAuth1` provider
    OAuth1(Box<dyn OAuth1Provider>),
    /// `OAuth2` provider
    OAuth2(Box<dyn OAuth2Provider>),
}

impl Provider {
    /// Registry name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OAuth1(p) => p.name(),
            Self::OAuth2(p) => p.name(),
        }
    }

    /// Whether this is an `OAuth1` provider
    #[must_use]
    pub const fn is_oauth1(&self) -> bool {
        matches!(self, Self::OAuth1(_))
    }

    /// Whether this is an `OAuth2` provider
    #[must_use]
    pub const fn is_oauth2(&self) -> bool {
        matches!(self, Self::OAuth2(_))
    }

    /// `OAuth1` capability
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::WrongCapability`] for an `OAuth2` provider
    pub fn as_oauth1(&self) -> Result<&dyn OAuth1Provider, ProviderError> {
        match self {
            Self::OAuth1(p) => Ok(p.as_ref()),
            Self::OAuth2(p) => Err(ProviderError::WrongCapability {
                provider: p.name().to_owned(),
                capability: "OAuth1",
            }),
        }
    }

    /// `OAuth2` capability
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::WrongCapability`] for an `OAuth1` provider
    pub fn as_oauth2(&self) -> Result<&dyn OAuth2Provider, ProviderError> {
        match self {
            Self::OAuth2(p) => Ok(p.as_ref()),
            Self::OAuth1(p) => Err(ProviderError::WrongCapability {
                provider: p.name().to_owned(),
                capability: "OAuth2",
            }),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocol = if self.is_oauth1() { "OAuth1" } else { "OAuth2" };
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("protocol", &protocol)
            .finish()
    }
}
