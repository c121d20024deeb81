// ABOUTME: Error types for ID token validation and service JWT handling
// ABOUTME: Closed error kinds for signature, issuer, audience, time, nonce and claim failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppError, ErrorCode};
use thiserror::Error;

/// Reason a foreign-issued ID token was rejected.
///
/// These are never recovered from silently: each indicates either an attack
/// or a misconfiguration.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdTokenError {
    /// Token is not a well-formed JWT or its header is unusable
    #[error("malformed token: {0}")]
    Malformed(String),

    /// No signing key with the token's key id could be resolved
    #[error("no signing key for kid '{kid}'")]
    UnknownKey {
        /// Key id from the token header
        kid: String,
    },

    /// Key material could not be fetched or parsed
    #[error("key resolution failed: {0}")]
    KeyResolution(String),

    /// Signature did not verify, or the algorithm is not the provider's
    #[error("invalid signature")]
    InvalidSignature,

    /// Issuer does not match the provider
    #[error("wrong issuer '{actual}', expected '{expected}'")]
    WrongIssuer {
        /// Issuer the validator accepts
        expected: String,
        /// Issuer found in the token
        actual: String,
    },

    /// Audience absent, empty, or not among the accepted audiences
    #[error("invalid audience")]
    InvalidAudience,

    /// `iat` lies after the validation time
    #[error("token used before issued")]
    UsedBeforeIssued,

    /// `exp` missing or before the validation time
    #[error("token is expired")]
    Expired,

    /// Nonce digest mismatch, or a nonce was presented for a token without one
    #[error("nonce mismatch")]
    NonceMismatch,

    /// Claim present with the wrong JSON type
    #[error("malformed claim '{claim}'")]
    MalformedClaim {
        /// Offending claim name
        claim: String,
    },

    /// No validator is configured for the provider
    #[error("unsupported provider '{0}'")]
    UnsupportedProvider(String),
}

impl IdTokenError {
    /// Error code carried to the API boundary
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) => ErrorCode::AuthMalformed,
            Self::UnknownKey { .. } | Self::InvalidSignature => ErrorCode::IdTokenInvalidSignature,
            Self::KeyResolution(_) => ErrorCode::ExternalServiceUnavailable,
            Self::WrongIssuer { .. } => ErrorCode::IdTokenWrongIssuer,
            Self::InvalidAudience => ErrorCode::IdTokenInvalidAudience,
            Self::UsedBeforeIssued => ErrorCode::IdTokenUsedBeforeIssued,
            Self::Expired => ErrorCode::IdTokenExpired,
            Self::NonceMismatch => ErrorCode::IdTokenNonceMismatch,
            Self::MalformedClaim { .. } => ErrorCode::IdTokenMalformedClaims,
            Self::UnsupportedProvider(_) => ErrorCode::UnsupportedProvider,
        }
    }
}

impl From<IdTokenError> for AppError {
    fn from(error: IdTokenError) -> Self {
        let app = Self::new(error.code(), error.to_string());
        match error {
            IdTokenError::MalformedClaim { claim } => app.with_claim(claim),
            IdTokenError::UnsupportedProvider(provider) => app.with_provider(provider),
            _ => app,
        }
    }
}

/// Failure while minting or verifying the service's own tokens
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    /// The session is missing a recent step-up proof
    #[error("elevated claim required")]
    ElevatedClaimRequired,

    /// Token signature or structure is invalid
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Token is past its expiry
    #[error("token is expired")]
    Expired,

    /// Signing failed
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// The configured key cannot be used for the requested operation
    #[error("invalid signing key: {0}")]
    Key(String),
}

impl From<JwtError> for AppError {
    fn from(error: JwtError) -> Self {
        let code = match &error {
            JwtError::ElevatedClaimRequired => ErrorCode::ElevatedClaimRequired,
            JwtError::Invalid(_) => ErrorCode::AuthInvalid,
            JwtError::Expired => ErrorCode::AuthExpired,
            JwtError::Signing(_) => ErrorCode::InternalError,
            JwtError::Key(_) => ErrorCode::ConfigInvalid,
        };
        Self::new(code, error.to_string())
    }
}

#[cfg(feature = "token-errors")]
impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match error.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey => {
                Self::Key(error.to_string())
            }
            _ => Self::Invalid(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_token_errors_map_to_distinct_codes() {
        let codes = [
            IdTokenError::InvalidSignature.code(),
            IdTokenError::InvalidAudience.code(),
            IdTokenError::UsedBeforeIssued.code(),
            IdTokenError::Expired.code(),
            IdTokenError::NonceMismatch.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_malformed_claim_context() {
        let app: AppError = IdTokenError::MalformedClaim {
            claim: "email_verified".to_owned(),
        }
        .into();
        assert_eq!(app.code, ErrorCode::IdTokenMalformedClaims);
        assert_eq!(app.context.claim.as_deref(), Some("email_verified"));
    }

    #[test]
    fn test_elevated_claim_required_code() {
        let app: AppError = JwtError::ElevatedClaimRequired.into();
        assert_eq!(app.code, ErrorCode::ElevatedClaimRequired);
        assert_eq!(app.message, "elevated claim required");
    }
}
