// ABOUTME: Identity provider identifiers shared by configuration, registry and validators
// ABOUTME: Names match the path segment used in sign-in and callback URLs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Apple (OAuth2 hybrid code + ID token, and native ID token)
pub const APPLE: &str = "apple";
/// Microsoft Azure AD v1 endpoints
pub const AZUREAD: &str = "azuread";
/// Bitbucket
pub const BITBUCKET: &str = "bitbucket";
/// Discord
pub const DISCORD: &str = "discord";
/// Microsoft Entra ID v2 endpoints
pub const ENTRAID: &str = "entraid";
/// Facebook
pub const FACEBOOK: &str = "facebook";
/// Test provider with a static signing key
pub const FAKE: &str = "fake";
/// GitHub
pub const GITHUB: &str = "github";
/// GitLab
pub const GITLAB: &str = "gitlab";
/// Google (OAuth2 and native ID token)
pub const GOOGLE: &str = "google";
/// `LinkedIn`
pub const LINKEDIN: &str = "linkedin";
/// Spotify
pub const SPOTIFY: &str = "spotify";
/// Strava
pub const STRAVA: &str = "strava";
/// Twitch
pub const TWITCH: &str = "twitch";
/// Twitter (`OAuth1`)
pub const TWITTER: &str = "twitter";
/// Windows Live
pub const WINDOWSLIVE: &str = "windowslive";
/// `WorkOS` SSO
pub const WORKOS: &str = "workos";

/// Every provider that can be enabled through configuration, in registry order
pub const ALL_OAUTH_PROVIDERS: &[&str] = &[
    APPLE,
    AZUREAD,
    BITBUCKET,
    DISCORD,
    ENTRAID,
    FACEBOOK,
    GITHUB,
    GITLAB,
    GOOGLE,
    LINKEDIN,
    SPOTIFY,
    STRAVA,
    TWITCH,
    TWITTER,
    WINDOWSLIVE,
    WORKOS,
];
