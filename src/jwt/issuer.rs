// ABOUTME: Mints and verifies the service's own access tokens
// ABOUTME: Merges roles, custom claims and the elevated flag into the claims namespace
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Header, Validation};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::custom_claims::{pg_encode, CustomClaimer};
use super::elevated::ElevatedClaimPolicy;
use super::secret::{JsonWebKeySet, SigningKeys};
use crate::config::{ElevatedClaimMode, ServerConfig};
use crate::constants::jwt;
use crate::errors::{AppError, AppResult, JwtError};
use crate::models::User;
use crate::users::UsersStore;

/// Per-issuance session facts
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// The session passed a recent step-up check
    pub elevated: bool,
    /// Extra namespace claims; these may overwrite defaults
    pub extra_claims: Map<String, Value>,
}

impl SessionContext {
    /// Context for a session that just passed step-up
    #[must_use]
    pub fn elevated() -> Self {
        Self {
            elevated: true,
            ..Self::default()
        }
    }
}

/// A freshly minted access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Signed token
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Claims of a verified service token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    claims: Map<String, Value>,
    namespace: String,
}

impl TokenClaims {
    /// Wrap raw claims
    #[must_use]
    pub fn new(claims: Map<String, Value>, namespace: impl Into<String>) -> Self {
        Self {
            claims,
            namespace: namespace.into(),
        }
    }

    /// `sub`
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }

    /// A string claim inside the namespace object
    #[must_use]
    pub fn custom_claim(&self, name: &str) -> Option<&str> {
        self.claims
            .get(&self.namespace)
            .and_then(|ns| ns.get(name))
            .and_then(Value::as_str)
    }

    /// User id from the namespace
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` if the claim is missing or not a UUID
    pub fn user_id(&self) -> AppResult<Uuid> {
        let raw = self.custom_claim(jwt::USER_ID).unwrap_or_default();
        Uuid::parse_str(raw).map_err(|e| AppError::auth_invalid(format!("error parsing user id: {e}")))
    }

    /// Anonymous marker from the namespace
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.custom_claim(jwt::USER_IS_ANONYMOUS) == Some("true")
    }

    /// Any top-level claim
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// All claims
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }
}

/// Issues and validates the service's access tokens
#[derive(Clone)]
pub struct JwtGetter {
    keys: SigningKeys,
    access_token_ttl: Duration,
    custom_claims: Option<Arc<dyn CustomClaimer>>,
    elevated: ElevatedClaimPolicy,
}

impl JwtGetter {
    /// Create a getter from the raw secret JSON
    ///
    /// # Errors
    ///
    /// Returns a config error if the secret cannot be parsed
    pub fn new(
        secret: &str,
        access_token_ttl: Duration,
        custom_claims: Option<Arc<dyn CustomClaimer>>,
        elevated_claim: ElevatedClaimMode,
        users: Arc<dyn UsersStore>,
    ) -> AppResult<Self> {
        Ok(Self {
            keys: SigningKeys::from_json(secret)?,
            access_token_ttl,
            custom_claims,
            elevated: ElevatedClaimPolicy::new(elevated_claim, users),
        })
    }

    /// Create a getter from server configuration
    ///
    /// # Errors
    ///
    /// Returns a config error if the secret cannot be parsed
    pub fn from_config(
        config: &ServerConfig,
        custom_claims: Option<Arc<dyn CustomClaimer>>,
        users: Arc<dyn UsersStore>,
    ) -> AppResult<Self> {
        Self::new(
            &config.jwt.secret,
            config.jwt.access_token_ttl,
            custom_claims,
            config.jwt.elevated_claim,
            users,
        )
    }

    /// Whether tokens are signed with an asymmetric key
    #[must_use]
    pub const fn is_asymmetric(&self) -> bool {
        self.keys.is_asymmetric()
    }

    /// Public keys for distribution
    #[must_use]
    pub const fn jwks(&self) -> &JsonWebKeySet {
        self.keys.jwks()
    }

    /// Claims namespace
    #[must_use]
    pub fn claims_namespace(&self) -> &str {
        &self.keys.claims_namespace
    }

    /// Token issuer
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.keys.issuer
    }

    fn header(&self) -> Header {
        let mut header = Header::new(self.keys.algorithm);
        header.kid.clone_from(&self.keys.kid);
        header
    }

    /// Mint an access token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if custom claims cannot be resolved or signing fails
    pub async fn issue(&self, user: &User, session: &SessionContext) -> AppResult<IssuedToken> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.access_token_ttl)
            .map_err(|e| AppError::config(format!("invalid access token ttl: {e}")))?;

        let mut namespace = Map::new();
        namespace.insert(jwt::ALLOWED_ROLES.to_owned(), json!(user.allowed_roles));
        namespace.insert(jwt::DEFAULT_ROLE.to_owned(), json!(user.default_role));
        namespace.insert(jwt::USER_ID.to_owned(), json!(user.id.to_string()));
        namespace.insert(
            jwt::USER_IS_ANONYMOUS.to_owned(),
            json!(user.is_anonymous.to_string()),
        );

        if let Some(claimer) = &self.custom_claims {
            let resolved = claimer.get_claims(user.id).await.map_err(|e| {
                warn!(user_id = %user.id, error = %e, "Error getting custom claims");
                e.with_claim("custom_claims")
            })?;
            add_claims(&mut namespace, &resolved, false);

            let defaults = claimer.defaults();
            if !defaults.is_empty() {
                let encoded: Map<String, Value> = defaults
                    .iter()
                    .map(|(k, v)| (prefixed(k), Value::String(pg_encode(v))))
                    .collect();
                namespace.insert(jwt::CUSTOM_CLAIMS_DEFAULTS.to_owned(), Value::Object(encoded));
            }
        }

        if session.elevated && self.elevated.embeds_claim(user.id).await? {
            namespace.insert(jwt::ELEVATED.to_owned(), json!(user.id.to_string()));
        }
        add_claims(&mut namespace, &session.extra_claims, true);

        let mut claims = Map::new();
        claims.insert("sub".to_owned(), json!(user.id.to_string()));
        claims.insert(self.keys.claims_namespace.clone(), Value::Object(namespace));

        let access_token = self.sign_with_claims(claims, now + ttl)?;
        debug!(user_id = %user.id, elevated = session.elevated, "Issued access token");

        Ok(IssuedToken {
            access_token,
            expires_in: self.access_token_ttl.as_secs(),
        })
    }

    /// Sign arbitrary claims, stamping `iss`, `iat` and `exp`
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn sign_with_claims(
        &self,
        mut claims: Map<String, Value>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<String> {
        claims.insert("iss".to_owned(), json!(self.keys.issuer));
        claims.insert("iat".to_owned(), json!(Utc::now().timestamp()));
        claims.insert("exp".to_owned(), json!(expires_at.timestamp()));

        encode(&self.header(), &claims, &self.keys.encoding)
            .map_err(|e| JwtError::Signing(e.to_string()).into())
    }

    /// Verify a token minted by this service
    ///
    /// Checks the algorithm, signature, issuer and expiry, and that `iat` is
    /// not in the future.
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` or `AuthExpired`
    pub fn validate(&self, token: &str) -> AppResult<TokenClaims> {
        let mut validation = Validation::new(self.keys.algorithm);
        validation.set_issuer(&[&self.keys.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.validate_aud = false;
        validation.leeway = 0;

        let data = decode::<Map<String, Value>>(token, &self.keys.decoding, &validation)
            .map_err(JwtError::from)?;

        let issued_at = data.claims.get("iat").and_then(Value::as_i64);
        if issued_at.is_some_and(|iat| iat > Utc::now().timestamp()) {
            return Err(JwtError::Invalid("token used before issued".to_owned()).into());
        }

        Ok(TokenClaims::new(data.claims, self.keys.claims_namespace.clone()))
    }

    /// Enforce the elevated-claim policy for a sensitive request
    ///
    /// # Errors
    ///
    /// Returns `ElevatedClaimRequired` when the policy demands a step-up proof the session lacks
    pub async fn require_elevated_claim(
        &self,
        claims: &TokenClaims,
        request_path: &str,
    ) -> AppResult<()> {
        self.elevated.check(claims, request_path).await
    }
}

impl std::fmt::Debug for JwtGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtGetter")
            .field("keys", &self.keys)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("custom_claims", &self.custom_claims.is_some())
            .finish_non_exhaustive()
    }
}

fn prefixed(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.starts_with(jwt::CLAIM_PREFIX) {
        lower
    } else {
        format!("{}{lower}", jwt::CLAIM_PREFIX)
    }
}

/// Merge claims into the namespace, prefixing and encoding each value
fn add_claims(namespace: &mut Map<String, Value>, claims: &Map<String, Value>, overwrite: bool) {
    for (name, value) in claims {
        let key = prefixed(name);
        if !overwrite && namespace.contains_key(&key) {
            continue;
        }
        namespace.insert(key, Value::String(pg_encode(value)));
    }
}
