// ABOUTME: Static descriptor table for every supported identity provider
// ABOUTME: Declares protocol, endpoints, default scopes and email-verification policy per provider
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Provider descriptors
//!
//! Every provider the registry can build is described here, so the mapping
//! from name to endpoints, default scopes and email policy is inspectable
//! without constructing an adapter.
//!
//! Endpoint templates may contain `{tenant}`, which is replaced with the
//! configured tenant for providers carrying [`ProviderCapabilities::TENANT_ENDPOINTS`].
//!
//! ```rust
//! use federated_auth::providers::spi::{descriptor, ProviderCapabilities};
//!
//! let github = descriptor("github").unwrap();
//! assert!(github.capabilities.contains(ProviderCapabilities::OAUTH2));
//! assert_eq!(github.default_scopes, &["user:email"]);
//! ```

use std::fmt;

use crate::config::ProviderSettings;
use crate::constants::providers;

bitflags::bitflags! {
    /// Provider capability flags
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ProviderCapabilities: u8 {
        /// Request-token and HMAC-signed `OAuth1` dance
        const OAUTH1 = 0b0000_0001;
        /// Authorization-code `OAuth2` dance
        const OAUTH2 = 0b0000_0010;
        /// Native sign-in with a provider-issued ID token
        const ID_TOKEN = 0b0000_0100;
        /// Endpoints are scoped by a directory tenant
        const TENANT_ENDPOINTS = 0b0000_1000;
        /// Authorization URL carries provider-specific parameters
        const CUSTOM_AUTH_PARAMS = 0b0001_0000;
    }
}

impl ProviderCapabilities {
    /// Protocol label used in logs and the CLI
    #[must_use]
    pub const fn protocol(&self) -> &'static str {
        if self.contains(Self::OAUTH1) {
            "oauth1"
        } else {
            "oauth2"
        }
    }
}

/// How a provider's profile signals that the email address is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailVerification {
    /// The API exposes no signal; a returned address counts as verified
    WhenPresent,
    /// The provider asserts verification with an explicit flag
    Asserted,
    /// The provider never returns an email address
    Never,
}

impl EmailVerification {
    /// Apply the policy to an email and the provider's flag, if any
    #[must_use]
    pub fn is_verified(self, email: &str, asserted: bool) -> bool {
        match self {
            Self::WhenPresent => !email.is_empty(),
            Self::Asserted => !email.is_empty() && asserted,
            Self::Never => false,
        }
    }
}

/// Static description of one identity provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    /// Registry name and callback path segment
    pub name: &'static str,
    /// Human readable name
    pub display_name: &'static str,
    /// Protocol and feature flags
    pub capabilities: ProviderCapabilities,
    /// Authorization endpoint (`OAuth1`: the authorize page)
    pub auth_url: &'static str,
    /// Token endpoint (`OAuth1`: the access-token endpoint)
    pub token_url: &'static str,
    /// `OAuth1` request-token endpoint
    pub request_token_url: Option<&'static str>,
    /// Base URL for profile calls
    pub api_base_url: &'static str,
    /// Scopes requested when configuration names none
    pub default_scopes: &'static [&'static str],
    /// Email verification policy
    pub email_verification: EmailVerification,
}

impl fmt::Display for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.capabilities.protocol())
    }
}

/// Endpoints after applying configuration overrides and tenant interpolation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// `OAuth1` request-token endpoint
    pub request_token_url: Option<String>,
    /// Base URL for profile calls, without trailing slash
    pub api_base_url: String,
}

impl ProviderDescriptor {
    /// Resolve endpoints for a configured provider
    #[must_use]
    pub fn endpoints(&self, settings: &ProviderSettings) -> ResolvedEndpoints {
        let tenant = settings.tenant.as_deref().unwrap_or("common");
        let resolve = |configured: Option<&String>, default: &str| {
            let url = configured.map_or(default, String::as_str);
            if self.capabilities.contains(ProviderCapabilities::TENANT_ENDPOINTS) {
                url.replace("{tenant}", tenant)
            } else {
                url.to_owned()
            }
        };
        let overrides = &settings.endpoints;
        ResolvedEndpoints {
            auth_url: resolve(overrides.auth_url.as_ref(), self.auth_url),
            token_url: resolve(overrides.token_url.as_ref(), self.token_url),
            request_token_url: self
                .request_token_url
                .map(|default| resolve(overrides.request_token_url.as_ref(), default)),
            api_base_url: resolve(overrides.api_base_url.as_ref(), self.api_base_url)
                .trim_end_matches('/')
                .to_owned(),
        }
    }

    /// Configured scopes, or the defaults when none are configured
    #[must_use]
    pub fn scopes(&self, settings: &ProviderSettings) -> Vec<String> {
        if settings.scopes.is_empty() {
            self.default_scopes.iter().map(|s| (*s).to_owned()).collect()
        } else {
            settings.scopes.clone()
        }
    }
}

const OAUTH2: ProviderCapabilities = ProviderCapabilities::OAUTH2;

/// Every provider the registry can build
pub static DESCRIPTORS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        name: providers::APPLE,
        display_name: "Apple",
        capabilities: OAUTH2
            .union(ProviderCapabilities::ID_TOKEN)
            .union(ProviderCapabilities::CUSTOM_AUTH_PARAMS),
        auth_url: "https://appleid.apple.com/auth/authorize",
        token_url: "https://appleid.apple.com/auth/token",
        request_token_url: None,
        api_base_url: "https://appleid.apple.com",
        default_scopes: &["name", "email"],
        email_verification: EmailVerification::Asserted,
    },
    ProviderDescriptor {
        name: providers::AZUREAD,
        display_name: "Azure AD",
        capabilities: OAUTH2.union(ProviderCapabilities::TENANT_ENDPOINTS),
        auth_url: "https://login.microsoftonline.com/{tenant}/oauth2/authorize",
        token_url: "https://login.microsoftonline.com/{tenant}/oauth2/token",
        request_token_url: None,
        api_base_url: "https://login.microsoftonline.com/{tenant}",
        default_scopes: &["email", "profile", "openid", "offline_access"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::BITBUCKET,
        display_name: "Bitbucket",
        capabilities: OAUTH2,
        auth_url: "https://bitbucket.org/site/oauth2/authorize",
        token_url: "https://bitbucket.org/site/oauth2/access_token",
        request_token_url: None,
        api_base_url: "https://api.bitbucket.org",
        default_scopes: &["account"],
        email_verification: EmailVerification::Asserted,
    },
    ProviderDescriptor {
        name: providers::DISCORD,
        display_name: "Discord",
        capabilities: OAUTH2,
        auth_url: "https://discord.com/api/oauth2/authorize",
        token_url: "https://discord.com/api/oauth2/token",
        request_token_url: None,
        api_base_url: "https://discord.com",
        default_scopes: &["identify", "email"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::ENTRAID,
        display_name: "Microsoft Entra ID",
        capabilities: OAUTH2.union(ProviderCapabilities::TENANT_ENDPOINTS),
        auth_url: "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize",
        token_url: "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token",
        request_token_url: None,
        api_base_url: "https://login.microsoftonline.com/{tenant}",
        default_scopes: &["email", "profile", "openid", "offline_access"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::FACEBOOK,
        display_name: "Facebook",
        capabilities: OAUTH2,
        auth_url: "https://www.facebook.com/v3.2/dialog/oauth",
        token_url: "https://graph.facebook.com/v3.2/oauth/access_token",
        request_token_url: None,
        api_base_url: "https://graph.facebook.com",
        default_scopes: &["email"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::GITHUB,
        display_name: "GitHub",
        capabilities: OAUTH2,
        auth_url: "https://github.com/login/oauth/authorize",
        token_url: "https://github.com/login/oauth/access_token",
        request_token_url: None,
        api_base_url: "https://api.github.com",
        default_scopes: &["user:email"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::GITLAB,
        display_name: "GitLab",
        capabilities: OAUTH2,
        auth_url: "https://gitlab.com/oauth/authorize",
        token_url: "https://gitlab.com/oauth/token",
        request_token_url: None,
        api_base_url: "https://gitlab.com",
        default_scopes: &["read_user"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::GOOGLE,
        display_name: "Google",
        capabilities: OAUTH2.union(ProviderCapabilities::ID_TOKEN),
        auth_url: "https://accounts.google.com/o/oauth2/auth",
        token_url: "https://oauth2.googleapis.com/token",
        request_token_url: None,
        api_base_url: "https://www.googleapis.com",
        default_scopes: &["openid", "email", "profile"],
        email_verification: EmailVerification::Asserted,
    },
    ProviderDescriptor {
        name: providers::LINKEDIN,
        display_name: "LinkedIn",
        capabilities: OAUTH2,
        auth_url: "https://www.linkedin.com/oauth/v2/authorization",
        token_url: "https://www.linkedin.com/oauth/v2/accessToken",
        request_token_url: None,
        api_base_url: "https://api.linkedin.com",
        default_scopes: &["openid", "profile", "email"],
        email_verification: EmailVerification::Asserted,
    },
    ProviderDescriptor {
        name: providers::SPOTIFY,
        display_name: "Spotify",
        capabilities: OAUTH2,
        auth_url: "https://accounts.spotify.com/authorize",
        token_url: "https://accounts.spotify.com/api/token",
        request_token_url: None,
        api_base_url: "https://api.spotify.com",
        default_scopes: &["user-read-email"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::STRAVA,
        display_name: "Strava",
        capabilities: OAUTH2.union(ProviderCapabilities::CUSTOM_AUTH_PARAMS),
        auth_url: "https://www.strava.com/oauth/authorize",
        token_url: "https://www.strava.com/oauth/token",
        request_token_url: None,
        api_base_url: "https://www.strava.com",
        default_scopes: &["profile:read_all"],
        email_verification: EmailVerification::Never,
    },
    ProviderDescriptor {
        name: providers::TWITCH,
        display_name: "Twitch",
        capabilities: OAUTH2,
        auth_url: "https://id.twitch.tv/oauth2/authorize",
        token_url: "https://id.twitch.tv/oauth2/token",
        request_token_url: None,
        api_base_url: "https://api.twitch.tv",
        default_scopes: &["user:read:email"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::TWITTER,
        display_name: "Twitter",
        capabilities: ProviderCapabilities::OAUTH1,
        auth_url: "https://api.twitter.com/oauth/authenticate",
        token_url: "https://api.twitter.com/oauth/access_token",
        request_token_url: Some("https://api.twitter.com/oauth/request_token"),
        api_base_url: "https://api.twitter.com",
        default_scopes: &[],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::WINDOWSLIVE,
        display_name: "Windows Live",
        capabilities: OAUTH2,
        auth_url: "https://login.live.com/oauth20_authorize.srf",
        token_url: "https://login.live.com/oauth20_token.srf",
        request_token_url: None,
        api_base_url: "https://apis.live.net",
        default_scopes: &["wl.basic", "wl.emails"],
        email_verification: EmailVerification::WhenPresent,
    },
    ProviderDescriptor {
        name: providers::WORKOS,
        display_name: "WorkOS",
        capabilities: OAUTH2.union(ProviderCapabilities::CUSTOM_AUTH_PARAMS),
        auth_url: "https://api.workos.com/sso/authorize",
        token_url: "https://api.workos.com/sso/token",
        request_token_url: None,
        api_base_url: "https://api.workos.com",
        default_scopes: &[],
        email_verification: EmailVerification::WhenPresent,
    },
];

/// Descriptor for a provider name
#[must_use]
pub fn descriptor(name: &str) -> Option<&'static ProviderDescriptor> {
    DESCRIPTORS.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointOverrides;

    #[test]
    fn test_every_configurable_provider_has_a_descriptor() {
        for name in providers::ALL_OAUTH_PROVIDERS {
            assert!(descriptor(name).is_some(), "missing descriptor for {name}");
        }
        assert_eq!(DESCRIPTORS.len(), providers::ALL_OAUTH_PROVIDERS.len());
    }

    #[test]
    fn test_exactly_one_protocol_per_provider() {
        for d in DESCRIPTORS {
            let oauth1 = d.capabilities.contains(ProviderCapabilities::OAUTH1);
            let oauth2 = d.capabilities.contains(ProviderCapabilities::OAUTH2);
            assert!(oauth1 ^ oauth2, "{} must have exactly one protocol", d.name);
            assert_eq!(oauth1, d.request_token_url.is_some());
        }
    }

    #[test]
    fn test_tenant_interpolation() {
        let settings = ProviderSettings {
            tenant: Some("contoso".to_owned()),
            ..ProviderSettings::enabled("id", "secret")
        };
        let endpoints = descriptor(providers::AZUREAD).unwrap().endpoints(&settings);
        assert_eq!(
            endpoints.auth_url,
            "https://login.microsoftonline.com/contoso/oauth2/authorize"
        );
        assert_eq!(
            endpoints.token_url,
            "https://login.microsoftonline.com/contoso/oauth2/token"
        );
        assert_eq!(endpoints.api_base_url, "https://login.microsoftonline.com/contoso");

        let endpoints = descriptor(providers::ENTRAID).unwrap().endpoints(&settings);
        assert_eq!(
            endpoints.auth_url,
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize"
        );
        assert_eq!(
            endpoints.token_url,
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
        assert_eq!(endpoints.api_base_url, "https://login.microsoftonline.com/contoso");
        for d in DESCRIPTORS
            .iter()
            .filter(|d| d.capabilities.contains(ProviderCapabilities::TENANT_ENDPOINTS))
        {
            let endpoints = d.endpoints(&settings);
            assert!(endpoints.api_base_url.contains("/contoso"), "{} profile URL", d.name);
        }
    }

    #[test]
    fn test_overrides_win_and_lose_trailing_slash() {
        let settings = ProviderSettings {
            endpoints: EndpointOverrides {
                api_base_url: Some("https://gitlab.myapp.local/".to_owned()),
                ..EndpointOverrides::default()
            },
            ..ProviderSettings::enabled("id", "secret")
        };
        let endpoints = descriptor(providers::GITLAB).unwrap().endpoints(&settings);
        assert_eq!(endpoints.api_base_url, "https://gitlab.myapp.local");
        assert_eq!(endpoints.token_url, "https://gitlab.com/oauth/token");
    }

    #[test]
    fn test_scopes_fall_back_to_defaults() {
        let d = descriptor(providers::DISCORD).unwrap();
        let mut settings = ProviderSettings::enabled("id", "secret");
        assert_eq!(d.scopes(&settings), ["identify", "email"]);
        settings.scopes = vec!["identify".to_owned()];
        assert_eq!(d.scopes(&settings), ["identify"]);
    }

    #[test]
    fn test_email_policy_table() {
        assert!(EmailVerification::WhenPresent.is_verified("a@myapp.local", false));
        assert!(!EmailVerification::WhenPresent.is_verified("", true));
        assert!(!EmailVerification::Asserted.is_verified("a@myapp.local", false));
        assert!(EmailVerification::Asserted.is_verified("a@myapp.local", true));
        assert!(!EmailVerification::Never.is_verified("a@myapp.local", true));
        assert_eq!(
            descriptor(providers::STRAVA).unwrap().email_verification,
            EmailVerification::Never
        );
        assert_eq!(
            descriptor(providers::GITHUB).unwrap().email_verification,
            EmailVerification::WhenPresent
        );
    }
}
