// ABOUTME: Verifies foreign-issued ID tokens: signature, issuer, audience, time bounds and nonce
// ABOUTME: Used for native ID-token sign-in and inside the Apple OAuth2 hybrid flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! ID token validation
//!
//! Nothing in a token is trusted until every check passes. Checks run in a
//! fixed order:
//!
//! 1. resolve the signing key (JWKS, or a static key for the test provider)
//! 2. verify the signature with the provider's single declared algorithm
//! 3. issuer equals the provider's issuer
//! 4. audience matches any accepted audience
//! 5. `iat` is not in the future and `exp` is present and not in the past
//! 6. nonce: when the token carries one it must equal `hex(sha256(presented))`;
//!    when it carries none the presented nonce must be empty

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::jwks::JwksCache;
use crate::errors::IdTokenError;
use crate::models::Profile;

/// Where verification keys come from
#[derive(Clone)]
pub enum KeySource {
    /// Provider-published key set
    Jwks(Arc<JwksCache>),
    /// Fixed key, for the test provider
    Static(DecodingKey),
}

impl KeySource {
    async fn resolve(&self, kid: Option<&str>) -> Result<DecodingKey, IdTokenError> {
        match self {
            Self::Jwks(cache) => cache.get_key(kid).await,
            Self::Static(key) => Ok(key.clone()),
        }
    }
}

/// Claims of a verified ID token
#[derive(Debug, Clone, PartialEq)]
pub struct IdTokenClaims(Map<String, Value>);

impl IdTokenClaims {
    /// Any claim
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// `sub`
    #[must_use]
    pub fn subject(&self) -> &str {
        self.0.get("sub").and_then(Value::as_str).unwrap_or_default()
    }

    /// All claims
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn optional_string(&self, claim: &str) -> Result<String, IdTokenError> {
        match self.0.get(claim) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(malformed(claim)),
        }
    }

    /// `email_verified`, accepting the string form some providers send
    fn email_verified(&self) -> Result<bool, IdTokenError> {
        match self.0.get("email_verified") {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s == "true" => Ok(true),
            Some(Value::String(s)) if s == "false" => Ok(false),
            Some(_) => Err(malformed("email_verified")),
        }
    }

    /// Normalized profile
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::MalformedClaim`] when a profile claim has the wrong type
    pub fn to_profile(&self) -> Result<Profile, IdTokenError> {
        Ok(Profile {
            provider_user_id: self.optional_string("sub")?,
            email: self.optional_string("email")?,
            email_verified: self.email_verified()?,
            name: self.optional_string("name")?,
            picture: self.optional_string("picture")?,
        })
    }
}

/// Per-provider ID token validator
#[derive(Clone)]
pub struct IdTokenValidator {
    provider: String,
    issuer: String,
    algorithm: Algorithm,
    audiences: Vec<String>,
    keys: KeySource,
}

impl std::fmt::Debug for IdTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenValidator")
            .field("provider", &self.provider)
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .field("audiences", &self.audiences)
            .finish_non_exhaustive()
    }
}

impl IdTokenValidator {
    /// Create a validator
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        issuer: impl Into<String>,
        algorithm: Algorithm,
        audiences: Vec<String>,
        keys: KeySource,
    ) -> Self {
        Self {
            provider: provider.into(),
            issuer: issuer.into(),
            algorithm,
            audiences,
            keys,
        }
    }

    /// Provider name
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Accepted audiences
    #[must_use]
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    /// Validate against the current time
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`IdTokenError`]
    pub async fn validate(&self, token: &str, nonce: &str) -> Result<IdTokenClaims, IdTokenError> {
        self.validate_at(token, nonce, Utc::now().timestamp()).await
    }

    /// Validate against a fixed unix time
    ///
    /// # Errors
    ///
    /// Returns the first failed check as an [`IdTokenError`]
    pub async fn validate_at(
        &self,
        token: &str,
        nonce: &str,
        now: i64,
    ) -> Result<IdTokenClaims, IdTokenError> {
        let result = self.check(token, nonce, now).await;
        if let Err(e) = &result {
            debug!(provider = %self.provider, error = %e, "ID token rejected");
        }
        result
    }

    async fn check(&self, token: &str, nonce: &str, now: i64) -> Result<IdTokenClaims, IdTokenError> {
        let header =
            decode_header(token).map_err(|e| IdTokenError::Malformed(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(IdTokenError::InvalidSignature);
        }

        let key = self.keys.resolve(header.kid.as_deref()).await?;

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken => {
                    IdTokenError::Malformed(e.to_string())
                }
                _ => IdTokenError::InvalidSignature,
            })?
            .claims;

        self.check_issuer(&claims)?;
        self.check_audience(&claims)?;
        check_time_bounds(&claims, now)?;
        check_nonce(&claims, nonce)?;

        Ok(IdTokenClaims(claims))
    }

    fn check_issuer(&self, claims: &Map<String, Value>) -> Result<(), IdTokenError> {
        let actual = match claims.get("iss") {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(malformed("iss")),
        };
        if actual == self.issuer {
            Ok(())
        } else {
            Err(IdTokenError::WrongIssuer {
                expected: self.issuer.clone(),
                actual: actual.to_owned(),
            })
        }
    }

    fn check_audience(&self, claims: &Map<String, Value>) -> Result<(), IdTokenError> {
        let token_audiences: Vec<&str> = match claims.get("aud") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().ok_or_else(|| malformed("aud")))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(malformed("aud")),
        };

        let matched = token_audiences
            .iter()
            .filter(|a| !a.is_empty())
            .any(|a| self.audiences.iter().any(|accepted| accepted == a));
        if matched {
            Ok(())
        } else {
            Err(IdTokenError::InvalidAudience)
        }
    }
}

fn malformed(claim: &str) -> IdTokenError {
    IdTokenError::MalformedClaim {
        claim: claim.to_owned(),
    }
}

fn numeric_claim(claims: &Map<String, Value>, claim: &str) -> Result<Option<i64>, IdTokenError> {
    match claims.get(claim) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| malformed(claim)),
        Some(_) => Err(malformed(claim)),
    }
}

fn check_time_bounds(claims: &Map<String, Value>, now: i64) -> Result<(), IdTokenError> {
    if numeric_claim(claims, "iat")?.is_some_and(|iat| iat > now) {
        return Err(IdTokenError::UsedBeforeIssued);
    }
    match numeric_claim(claims, "exp")? {
        Some(exp) if exp > now => Ok(()),
        _ => Err(IdTokenError::Expired),
    }
}

/// Lowercase hex SHA-256 of a presented nonce
#[must_use]
pub fn hash_nonce(nonce: &str) -> String {
    hex::encode(Sha256::digest(nonce.as_bytes()))
}

fn check_nonce(claims: &Map<String, Value>, presented: &str) -> Result<(), IdTokenError> {
    match claims.get("nonce") {
        None | Some(Value::Null) if presented.is_empty() => Ok(()),
        None | Some(Value::Null) => Err(IdTokenError::NonceMismatch),
        Some(Value::String(expected)) if *expected == hash_nonce(presented) => Ok(()),
        Some(Value::String(_)) => Err(IdTokenError::NonceMismatch),
        Some(_) => Err(malformed("nonce")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_hash_nonce() {
        assert_eq!(
            hash_nonce("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_nonce_rules() {
        let with_nonce = claims(json!({ "nonce": hash_nonce("n-0S6_WzA2Mj") }));
        assert!(check_nonce(&with_nonce, "n-0S6_WzA2Mj").is_ok());
        assert_eq!(check_nonce(&with_nonce, ""), Err(IdTokenError::NonceMismatch));
        assert_eq!(check_nonce(&with_nonce, "other"), Err(IdTokenError::NonceMismatch));

        let without = claims(json!({}));
        assert!(check_nonce(&without, "").is_ok());
        assert_eq!(check_nonce(&without, "unexpected"), Err(IdTokenError::NonceMismatch));

        let wrong_type = claims(json!({ "nonce": 5 }));
        assert!(matches!(
            check_nonce(&wrong_type, ""),
            Err(IdTokenError::MalformedClaim { .. })
        ));
    }

    #[test]
    fn test_time_bounds() {
        let ok = claims(json!({ "iat": 100, "exp": 200 }));
        assert!(check_time_bounds(&ok, 150).is_ok());
        assert_eq!(check_time_bounds(&ok, 50), Err(IdTokenError::UsedBeforeIssued));
        assert_eq!(check_time_bounds(&ok, 200), Err(IdTokenError::Expired));

        let no_exp = claims(json!({ "iat": 100 }));
        assert_eq!(check_time_bounds(&no_exp, 150), Err(IdTokenError::Expired));

        let bad_type = claims(json!({ "iat": "100", "exp": 200 }));
        assert!(matches!(
            check_time_bounds(&bad_type, 150),
            Err(IdTokenError::MalformedClaim { .. })
        ));
    }

    #[test]
    fn test_profile_accepts_string_email_verified() {
        let token = IdTokenClaims(claims(json!({
            "sub": "001234.abcd",
            "email": "jane@privaterelay.appleid.com",
            "email_verified": "true"
        })));
        let profile = token.to_profile().unwrap();
        assert_eq!(profile.provider_user_id, "001234.abcd");
        assert!(profile.email_verified);

        let bad = IdTokenClaims(claims(json!({ "sub": "x", "email_verified": 1 })));
        assert!(bad.to_profile().is_err());
    }
}
