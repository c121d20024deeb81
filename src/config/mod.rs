// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Environment-driven server, token, provider and throttling configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! - **Environment**: server, token, custom claim and rate limit settings
//! - **Providers**: identity provider credentials and endpoint overrides

/// Environment and server configuration
pub mod environment;
/// Identity provider configuration
pub mod providers;

pub use environment::{
    parse_duration, parse_scopes, CustomClaimsConfig, ElevatedClaimMode, JwtConfig, LimitConfig,
    RateLimitConfig, RateLimitStoreKind, ServerConfig,
};
pub use providers::{
    AppleSigningSettings, EndpointOverrides, FakeProviderSettings, ProviderSettings,
    ProvidersConfig, WorkosDefaults,
};
