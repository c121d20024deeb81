// ABOUTME: Identity provider integrations behind OAuth1 and OAuth2 capability traits
// ABOUTME: Descriptor table, shared protocol clients, per-provider adapters and the registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Identity providers
//!
//! Each enabled provider is registered once at startup as a [`Provider`],
//! which is exactly one of an [`OAuth1Provider`] or an [`OAuth2Provider`].
//! Callers look a provider up by name, branch once on the protocol and then
//! drive the redirect dance through the matching capability:
//!
//! ```rust,no_run
//! # use federated_auth::providers::{ProviderRegistry, ProviderSpecificParams};
//! # use federated_auth::errors::AppResult;
//! # fn run(registry: &ProviderRegistry, state: &str) -> AppResult<()> {
//! let provider = registry.get("github")?;
//! if provider.is_oauth2() {
//!     let url = provider
//!         .as_oauth2()?
//!         .auth_code_url(state, &ProviderSpecificParams::default())?;
//!     println!("redirect to {url}");
//! }
//! # Ok(())
//! # }
//! ```

/// Provider capability traits and the `Provider` sum type
pub mod core;
/// `OAuth1` request signing
pub mod oauth1;
/// Generic `OAuth2` authorization-code client
pub mod oauth2;
/// Registry of enabled providers
pub mod registry;
/// Static provider descriptor table
pub mod spi;

/// Sign in with Apple
pub mod apple;
/// Bitbucket
pub mod bitbucket;
/// Discord
pub mod discord;
/// Facebook
pub mod facebook;
/// GitHub
pub mod github;
/// GitLab
pub mod gitlab;
/// Google
pub mod google;
/// `LinkedIn`
pub mod linkedin;
/// Azure AD and Entra ID
pub mod microsoft;
/// Spotify
pub mod spotify;
/// Strava
pub mod strava;
/// Twitch
pub mod twitch;
/// Twitter
pub mod twitter;
/// Windows Live
pub mod windowslive;
/// `WorkOS`
pub mod workos;

pub use self::core::{
    OAuth1Provider, OAuth1Token, OAuth2Provider, Provider, ProviderSpecificParams,
};
pub use oauth1::OAuth1Signer;
pub use oauth2::{OAuth2Client, OAuth2Config, OAuth2Token};
pub use registry::{callback_url, ProviderRegistry};
pub use spi::{descriptor, EmailVerification, ProviderCapabilities, ProviderDescriptor};
