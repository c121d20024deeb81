// ABOUTME: Parses the JWT secret configuration into signing and verification keys
// ABOUTME: Supports HMAC (HS256/384/512) and RSA (RS256/384/512) and publishes RSA keys as a JWK set
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 Async-IO.org

//! JWT secret handling
//!
//! The secret is a JSON document:
//!
//! ```json
//! {"type": "RS256", "key": "<public PEM>", "signing_key": "<private PEM>", "kid": "k1"}
//! ```
//!
//! HMAC secrets carry the shared key in `key` and need no `signing_key`. The
//! algorithm family is fixed for the lifetime of the process.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};

use crate::constants::jwt;
use crate::errors::JwtError;

/// Raw JWT secret as configured
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSecret {
    /// Algorithm name
    #[serde(rename = "type")]
    pub algorithm: String,
    /// HMAC key, or RSA public key PEM
    pub key: String,
    /// RSA private key PEM
    #[serde(default)]
    pub signing_key: Option<String>,
    /// Key id placed in token headers
    #[serde(default, rename = "kid")]
    pub key_id: Option<String>,
    /// Token issuer
    #[serde(default)]
    pub issuer: Option<String>,
    /// Claim holding the authorization namespace
    #[serde(default)]
    pub claims_namespace: Option<String>,
}

/// JWK (JSON Web Key) representation for the JWKS endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type (always "RSA")
    pub kty: String,
    /// Public key use (always "sig")
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key ID
    pub kid: String,
    /// Algorithm
    pub alg: String,
    /// RSA modulus (base64url encoded)
    pub n: String,
    /// RSA exponent (base64url encoded)
    pub e: String,
}

/// JWKS (JSON Web Key Set) container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of public keys
    pub keys: Vec<JsonWebKey>,
}

/// Keys and token metadata derived from a [`JwtSecret`]
#[derive(Clone)]
pub struct SigningKeys {
    /// Signature algorithm
    pub algorithm: Algorithm,
    /// Key id placed in token headers
    pub kid: Option<String>,
    /// Token issuer
    pub issuer: String,
    /// Claim holding the authorization namespace
    pub claims_namespace: String,
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
    jwks: JsonWebKeySet,
}

impl std::fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeys")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .field("issuer", &self.issuer)
            .field("claims_namespace", &self.claims_namespace)
            .finish_non_exhaustive()
    }
}

impl SigningKeys {
    /// Parse the JSON secret
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::Key`] for malformed JSON, an unsupported type, or unusable key material
    pub fn from_json(raw: &str) -> Result<Self, JwtError> {
        let secret: JwtSecret = serde_json::from_str(raw)
            .map_err(|e| JwtError::Key(format!("invalid jwt secret: {e}")))?;
        Self::from_secret(secret)
    }

    /// Build keys from a parsed secret
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::Key`] for an unsupported type or unusable key material
    pub fn from_secret(secret: JwtSecret) -> Result<Self, JwtError> {
        let issuer = secret
            .issuer
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| jwt::DEFAULT_ISSUER.to_owned());
        let claims_namespace = secret
            .claims_namespace
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| jwt::DEFAULT_CLAIMS_NAMESPACE.to_owned());

        match secret.algorithm.as_str() {
            "HS256" | "HS384" | "HS512" => {
                if secret.key.is_empty() {
                    return Err(JwtError::Key(
                        "key is required for HS256, HS384, and HS512".to_owned(),
                    ));
                }
                Ok(Self {
                    algorithm: parse_algorithm(&secret.algorithm)?,
                    kid: secret.key_id,
                    issuer,
                    claims_namespace,
                    encoding: EncodingKey::from_secret(secret.key.as_bytes()),
                    decoding: DecodingKey::from_secret(secret.key.as_bytes()),
                    jwks: JsonWebKeySet::default(),
                })
            }
            "RS256" | "RS384" | "RS512" => {
                let signing_key = secret.signing_key.ok_or_else(|| {
                    JwtError::Key("signing_key is required for RS256, RS384, and RS512".to_owned())
                })?;
                let encoding = EncodingKey::from_rsa_pem(signing_key.as_bytes())
                    .map_err(|e| JwtError::Key(format!("error parsing rsa private key: {e}")))?;
                let decoding = DecodingKey::from_rsa_pem(secret.key.as_bytes())
                    .map_err(|e| JwtError::Key(format!("error parsing rsa public key: {e}")))?;
                let public_key = parse_rsa_public_key(&secret.key)?;

                let kid = secret
                    .key_id
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let jwks = JsonWebKeySet {
                    keys: vec![rsa_to_jwk(&public_key, &kid, &secret.algorithm)],
                };

                Ok(Self {
                    algorithm: parse_algorithm(&secret.algorithm)?,
                    kid: Some(kid),
                    issuer,
                    claims_namespace,
                    encoding,
                    decoding,
                    jwks,
                })
            }
            other => Err(JwtError::Key(format!("unsupported jwt type: {other}"))),
        }
    }

    /// Whether the algorithm family is asymmetric
    #[must_use]
    pub const fn is_asymmetric(&self) -> bool {
        matches!(
            self.algorithm,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
        )
    }

    /// Public keys for distribution; empty for HMAC secrets
    #[must_use]
    pub const fn jwks(&self) -> &JsonWebKeySet {
        &self.jwks
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, JwtError> {
    name.parse()
        .map_err(|_| JwtError::Key(format!("unsupported jwt type: {name}")))
}

fn parse_rsa_public_key(pem: &str) -> Result<RsaPublicKey, JwtError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| JwtError::Key(format!("error parsing rsa public key: {e}")))
}

fn rsa_to_jwk(public_key: &RsaPublicKey, kid: &str, alg: &str) -> JsonWebKey {
    JsonWebKey {
        kty: "RSA".to_owned(),
        key_use: "sig".to_owned(),
        kid: kid.to_owned(),
        alg: alg.to_owned(),
        n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_secret_defaults() {
        let keys = SigningKeys::from_json(r#"{"type":"HS256","key":"0123456789abcdef0123456789abcdef"}"#)
            .unwrap();
        assert_eq!(keys.algorithm, Algorithm::HS256);
        assert_eq!(keys.issuer, jwt::DEFAULT_ISSUER);
        assert_eq!(keys.claims_namespace, jwt::DEFAULT_CLAIMS_NAMESPACE);
        assert!(!keys.is_asymmetric());
        assert!(keys.jwks().keys.is_empty());
    }

    #[test]
    fn test_rejects_unknown_type_and_missing_key() {
        assert!(matches!(
            SigningKeys::from_json(r#"{"type":"ES256","key":"x"}"#),
            Err(JwtError::Key(_))
        ));
        assert!(SigningKeys::from_json(r#"{"type":"HS256","key":""}"#).is_err());
        assert!(SigningKeys::from_json(r#"{"type":"RS256","key":"x"}"#).is_err());
        assert!(SigningKeys::from_json("not json").is_err());
    }
}
