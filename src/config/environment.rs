// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed server, token, provider and throttling settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::providers::ProvidersConfig;
use crate::constants::{jwt, rate_limits};
use crate::errors::{AppError, AppResult};

/// Elevated-claim enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevatedClaimMode {
    /// Never require the elevated claim
    #[default]
    Disabled,
    /// Require it only for users who registered a security key
    Recommended,
    /// Always require it for sensitive actions
    Required,
}

impl FromStr for ElevatedClaimMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "disabled" => Ok(Self::Disabled),
            "recommended" => Ok(Self::Recommended),
            "required" => Ok(Self::Required),
            other => Err(AppError::config(format!(
                "Invalid AUTH_REQUIRE_ELEVATED_CLAIM value '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ElevatedClaimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Recommended => write!(f, "recommended"),
            Self::Required => write!(f, "required"),
        }
    }
}

/// Service token settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Raw JWT secret JSON (`HASURA_GRAPHQL_JWT_SECRET`)
    pub secret: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Elevated-claim policy
    pub elevated_claim: ElevatedClaimMode,
}

/// Custom claims data API settings
#[derive(Debug, Clone)]
pub struct CustomClaimsConfig {
    /// GraphQL endpoint
    pub graphql_url: String,
    /// Admin secret sent with every query
    pub admin_secret: String,
    /// Claim name to dot path (`[]` marks an array hop)
    pub claims: HashMap<String, String>,
    /// Claim name to default value
    pub defaults: HashMap<String, Value>,
}

/// One limiter's burst and window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Requests allowed per window
    pub burst: u64,
    /// Window length
    pub interval: Duration,
}

impl LimitConfig {
    /// Create a limit from a burst and a window in seconds
    #[must_use]
    pub const fn new(burst: u64, interval_secs: u64) -> Self {
        Self {
            burst,
            interval: Duration::from_secs(interval_secs),
        }
    }
}

/// Backing store for rate-limit windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitStoreKind {
    /// Process-local concurrent map
    #[default]
    Memory,
    /// Redis shared across instances
    Redis,
}

impl FromStr for RateLimitStoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::config(format!(
                "Invalid AUTH_RATE_LIMIT_STORE value '{other}'"
            ))),
        }
    }
}

/// Rate limiting settings
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Master switch
    pub enabled: bool,
    /// Per-IP limiter applied to every request
    pub global: LimitConfig,
    /// Limiter for requests that send email
    pub email: LimitConfig,
    /// Share one email budget across all clients
    pub email_is_global: bool,
    /// Limiter for requests that send SMS
    pub sms: LimitConfig,
    /// Limiter for sign-in, verification and OTP requests
    pub brute_force: LimitConfig,
    /// Limiter for signups
    pub signups: LimitConfig,
    /// Limiter for server-to-server token and introspection calls
    pub oauth2_server: LimitConfig,
    /// Which store holds the windows
    pub store: RateLimitStoreKind,
    /// Redis URL, required when `store` is `Redis`
    pub redis_url: Option<String>,
    /// Key namespace inside a shared store
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            global: LimitConfig::new(rate_limits::GLOBAL_BURST, rate_limits::GLOBAL_INTERVAL_SECS),
            email: LimitConfig::new(rate_limits::EMAIL_BURST, rate_limits::EMAIL_INTERVAL_SECS),
            email_is_global: false,
            sms: LimitConfig::new(rate_limits::SMS_BURST, rate_limits::SMS_INTERVAL_SECS),
            brute_force: LimitConfig::new(
                rate_limits::BRUTE_FORCE_BURST,
                rate_limits::BRUTE_FORCE_INTERVAL_SECS,
            ),
            signups: LimitConfig::new(
                rate_limits::SIGNUPS_BURST,
                rate_limits::SIGNUPS_INTERVAL_SECS,
            ),
            oauth2_server: LimitConfig::new(
                rate_limits::OAUTH2_SERVER_BURST,
                rate_limits::OAUTH2_SERVER_INTERVAL_SECS,
            ),
            store: RateLimitStoreKind::Memory,
            redis_url: None,
            key_prefix: rate_limits::DEFAULT_KEY_PREFIX.to_owned(),
        }
    }
}

impl RateLimitConfig {
    fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: env_bool("AUTH_RATE_LIMIT_ENABLE", defaults.enabled)?,
            global: limit_from_env("GLOBAL", defaults.global)?,
            email: limit_from_env("EMAIL", defaults.email)?,
            email_is_global: env_bool("AUTH_RATE_LIMIT_EMAIL_IS_GLOBAL", false)?,
            sms: limit_from_env("SMS", defaults.sms)?,
            brute_force: limit_from_env("BRUTE_FORCE", defaults.brute_force)?,
            signups: limit_from_env("SIGNUPS", defaults.signups)?,
            oauth2_server: limit_from_env("OAUTH2_SERVER", defaults.oauth2_server)?,
            store: env_var_or("AUTH_RATE_LIMIT_STORE", "memory").parse()?,
            redis_url: env_opt("AUTH_RATE_LIMIT_REDIS_URL"),
            key_prefix: env_var_or("AUTH_RATE_LIMIT_KEY_PREFIX", &defaults.key_prefix),
        })
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Public base URL of this service; callback URLs derive from it
    pub server_url: String,
    /// Default client redirect target
    pub client_url: String,
    /// Prefix stripped from request paths before throttling classification
    pub api_prefix: String,
    /// Service token settings
    pub jwt: JwtConfig,
    /// Custom claims, when configured
    pub custom_claims: Option<CustomClaimsConfig>,
    /// Identity providers
    pub providers: ProvidersConfig,
    /// Throttling
    pub rate_limit: RateLimitConfig,
    /// Whether sign-up requires a verified email (toggles which paths send mail)
    pub email_verification_required: bool,
    /// Replace error messages with generic descriptions at the API boundary
    pub conceal_errors: bool,
    /// Hex-encoded 32-byte key for secrets at rest
    pub encryption_key: Option<String>,
    /// This service acts as an OAuth2/OIDC identity provider for third parties
    pub oauth2_provider_enabled: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unparseable, or if
    /// [`ServerConfig::validate`] rejects the result
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let server_url = env_var_or("AUTH_SERVER_URL", "http://localhost:4000");
        let config = Self {
            client_url: env_var_or("AUTH_CLIENT_URL", "http://localhost:3000"),
            api_prefix: env_var_or("AUTH_API_PREFIX", ""),
            jwt: JwtConfig {
                secret: env::var("HASURA_GRAPHQL_JWT_SECRET")
                    .map_err(|_| AppError::config("HASURA_GRAPHQL_JWT_SECRET is required"))?,
                access_token_ttl: Duration::from_secs(env_parse(
                    "AUTH_ACCESS_TOKEN_EXPIRES_IN",
                    jwt::DEFAULT_ACCESS_TOKEN_TTL_SECS,
                )?),
                elevated_claim: env_var_or("AUTH_REQUIRE_ELEVATED_CLAIM", "disabled").parse()?,
            },
            custom_claims: custom_claims_from_env()?,
            providers: ProvidersConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            email_verification_required: env_bool(
                "AUTH_EMAIL_SIGNIN_EMAIL_VERIFIED_REQUIRED",
                true,
            )?,
            conceal_errors: env_bool("AUTH_CONCEAL_ERRORS", false)?,
            encryption_key: env_opt("AUTH_ENCRYPTION_KEY"),
            oauth2_provider_enabled: env_bool("AUTH_OAUTH2_PROVIDER_ENABLED", false)?,
            server_url,
        };

        config.validate()?;
        info!(
            providers = %config.providers.enabled_names().join(","),
            rate_limit = config.rate_limit.enabled,
            elevated_claim = %config.jwt.elevated_claim,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for inconsistent settings that would otherwise fail at request time
    pub fn validate(&self) -> AppResult<()> {
        url::Url::parse(&self.server_url)
            .map_err(|e| AppError::config(format!("Invalid AUTH_SERVER_URL: {e}")))?;

        if self.rate_limit.enabled
            && self.rate_limit.store == RateLimitStoreKind::Redis
            && self.rate_limit.redis_url.is_none()
        {
            return Err(AppError::config(
                "AUTH_RATE_LIMIT_STORE=redis requires AUTH_RATE_LIMIT_REDIS_URL",
            ));
        }

        if self.oauth2_provider_enabled && !jwt_secret_is_asymmetric(&self.jwt.secret) {
            return Err(AppError::config(
                "AUTH_OAUTH2_PROVIDER_ENABLED requires an RSA JWT secret (RS256, RS384 or RS512)",
            ));
        }

        self.providers.validate()
    }
}

/// Peek at the `type` of the JWT secret without building keys
fn jwt_secret_is_asymmetric(secret: &str) -> bool {
    serde_json::from_str::<Value>(secret)
        .ok()
        .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_owned))
        .is_some_and(|t| t.starts_with("RS"))
}

fn custom_claims_from_env() -> AppResult<Option<CustomClaimsConfig>> {
    let Some(raw_claims) = env_opt("AUTH_JWT_CUSTOM_CLAIMS") else {
        return Ok(None);
    };
    let claims: HashMap<String, String> = serde_json::from_str(&raw_claims)
        .map_err(|e| AppError::config(format!("Invalid AUTH_JWT_CUSTOM_CLAIMS: {e}")))?;
    if claims.is_empty() {
        return Ok(None);
    }

    let defaults = match env_opt("AUTH_JWT_CUSTOM_CLAIMS_DEFAULTS") {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            AppError::config(format!("Invalid AUTH_JWT_CUSTOM_CLAIMS_DEFAULTS: {e}"))
        })?,
        None => HashMap::new(),
    };

    Ok(Some(CustomClaimsConfig {
        graphql_url: env_var_or("HASURA_GRAPHQL_GRAPHQL_URL", "http://localhost:8080/v1/graphql"),
        admin_secret: env::var("HASURA_GRAPHQL_ADMIN_SECRET").map_err(|_| {
            AppError::config("HASURA_GRAPHQL_ADMIN_SECRET is required for custom claims")
        })?,
        claims,
        defaults,
    }))
}

fn limit_from_env(name: &str, default: LimitConfig) -> AppResult<LimitConfig> {
    let burst = env_parse(&format!("AUTH_RATE_LIMIT_{name}_BURST"), default.burst)?;
    let interval = match env_opt(&format!("AUTH_RATE_LIMIT_{name}_INTERVAL")) {
        Some(raw) => parse_duration(&raw)?,
        None => default.interval,
    };
    Ok(LimitConfig { burst, interval })
}

/// Get environment variable or default value
pub(crate) fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a non-empty environment variable
pub(crate) fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean environment variable
pub(crate) fn env_bool(key: &str, default: bool) -> AppResult<bool> {
    match env_opt(key) {
        None => Ok(default),
        Some(v) => match v.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::config(format!("Invalid {key} value '{v}'"))),
        },
    }
}

/// Parse an environment variable with `FromStr`
pub(crate) fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_opt(key).map_or(Ok(default), |v| {
        v.trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{v}': {e}")))
    })
}

/// Parse comma-separated scopes
#[must_use]
pub fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a Go-style duration such as `90s`, `5m` or `1h30m`
///
/// A bare integer is read as seconds.
///
/// # Errors
///
/// Returns a config error for empty input, unknown units, or overflow
pub fn parse_duration(input: &str) -> AppResult<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AppError::config("empty duration"));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let invalid = || AppError::config(format!("invalid duration '{input}'"));
    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];
        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(invalid)?),
            "h" => Duration::from_secs(value.checked_mul(3600).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };
        total = total.checked_add(unit).ok_or_else(invalid)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scopes() {
        assert_eq!(parse_scopes("openid, email ,profile"), vec!["openid", "email", "profile"]);
        assert_eq!(parse_scopes(""), Vec::<String>::new());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("42").unwrap(), Duration::from_secs(42));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("m5").is_err());
    }

    #[test]
    fn test_elevated_claim_mode_parsing() {
        assert_eq!(
            "Recommended".parse::<ElevatedClaimMode>().unwrap(),
            ElevatedClaimMode::Recommended
        );
        assert_eq!(
            "".parse::<ElevatedClaimMode>().unwrap(),
            ElevatedClaimMode::Disabled
        );
        assert!("sometimes".parse::<ElevatedClaimMode>().is_err());
    }

    #[test]
    fn test_jwt_secret_is_asymmetric() {
        assert!(jwt_secret_is_asymmetric(r#"{"type":"RS256","key":"x"}"#));
        assert!(!jwt_secret_is_asymmetric(r#"{"type":"HS256","key":"x"}"#));
        assert!(!jwt_secret_is_asymmetric("not json"));
    }
}
