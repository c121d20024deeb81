// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Pure data constants for providers, tokens, throttling and network defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Identity provider names
pub mod providers;

pub use providers::*;

/// Service JWT defaults and claim names
pub mod jwt {
    /// Issuer used when the JWT secret does not name one
    pub const DEFAULT_ISSUER: &str = "hasura-auth";
    /// Namespace object holding the authorization claims
    pub const DEFAULT_CLAIMS_NAMESPACE: &str = "https://hasura.io/jwt/claims";
    /// Prefix applied to every claim inside the namespace
    pub const CLAIM_PREFIX: &str = "x-hasura-";
    /// Roles the user may assume
    pub const ALLOWED_ROLES: &str = "x-hasura-allowed-roles";
    /// Role used when the request names none
    pub const DEFAULT_ROLE: &str = "x-hasura-default-role";
    /// Subject user id
    pub const USER_ID: &str = "x-hasura-user-id";
    /// Anonymous marker, `"true"` or `"false"`
    pub const USER_IS_ANONYMOUS: &str = "x-hasura-user-is-anonymous";
    /// Step-up proof, equal to the user id when present
    pub const ELEVATED: &str = "x-hasura-auth-elevated";
    /// Defaults applied to custom claims
    pub const CUSTOM_CLAIMS_DEFAULTS: &str = "x-hasura-custom-claims-defaults";
    /// Default access token lifetime in seconds
    pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 900;
    /// Lifetime of the signed state carried through a provider redirect
    pub const STATE_TTL_SECS: i64 = 300;
}

/// Foreign ID token issuers and key endpoints
pub mod oidc {
    /// Apple ID token issuer
    pub const APPLE_ISSUER: &str = "https://appleid.apple.com";
    /// Apple signing keys
    pub const APPLE_JWKS_URL: &str = "https://appleid.apple.com/auth/keys";
    /// Google ID token issuer
    pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";
    /// Google signing keys
    pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
    /// Issuer of the test provider
    pub const FAKE_ISSUER: &str = "fake.issuer";
    /// Default audience of the test provider
    pub const FAKE_AUDIENCE: &str = "myapp.local";
    /// Minimum time between two key set fetches triggered by unknown key ids
    pub const MIN_REFETCH_INTERVAL_SECS: u64 = 60;
    /// Default refresh interval when the key endpoint sends no max-age
    pub const DEFAULT_KEYS_TTL_SECS: u64 = 3600;
    /// Lower bound on any max-age honored from the key endpoint
    pub const MIN_KEYS_TTL_SECS: u64 = 300;
}

/// Rate limiter defaults
pub mod rate_limits {
    /// Requests per window for the per-IP global limiter
    pub const GLOBAL_BURST: u64 = 100;
    /// Global window in seconds
    pub const GLOBAL_INTERVAL_SECS: u64 = 60;
    /// Emails per window
    pub const EMAIL_BURST: u64 = 10;
    /// Email window in seconds
    pub const EMAIL_INTERVAL_SECS: u64 = 3600;
    /// SMS messages per window
    pub const SMS_BURST: u64 = 10;
    /// SMS window in seconds
    pub const SMS_INTERVAL_SECS: u64 = 3600;
    /// Sign-in and verification attempts per window
    pub const BRUTE_FORCE_BURST: u64 = 10;
    /// Brute force window in seconds
    pub const BRUTE_FORCE_INTERVAL_SECS: u64 = 300;
    /// Signups per window
    pub const SIGNUPS_BURST: u64 = 10;
    /// Signup window in seconds
    pub const SIGNUPS_INTERVAL_SECS: u64 = 300;
    /// Token and introspection calls per window
    pub const OAUTH2_SERVER_BURST: u64 = 100;
    /// OAuth2 server window in seconds
    pub const OAUTH2_SERVER_INTERVAL_SECS: u64 = 300;
    /// Key used by the email limiter when it is shared by all clients
    pub const GLOBAL_KEY: &str = "global";
    /// Default namespace for rate-limit keys in a shared store
    pub const DEFAULT_KEY_PREFIX: &str = "auth:ratelimit:";
}

/// Outbound network defaults
pub mod network {
    /// Timeout for token exchange and profile calls
    pub const PROVIDER_TIMEOUT_SECS: u64 = 10;
    /// Connect timeout for provider calls
    pub const PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 5;
    /// Timeout for the custom claims data API
    pub const CLAIMS_TIMEOUT_SECS: u64 = 10;
}

/// Service route paths referenced by providers and the throttling classifier
pub mod paths {
    /// Provider callback, relative to the server URL; `{provider}` is interpolated
    pub const PROVIDER_CALLBACK: &str = "/signin/provider/{provider}/callback";
    /// Security key enrollment, exempt from the elevated claim when no key exists
    pub const WEBAUTHN_ADD: &str = "/user/webauthn/add";
    /// Security key enrollment verification
    pub const WEBAUTHN_VERIFY: &str = "/user/webauthn/verify";
}
