// ABOUTME: Unified error handling with standard error codes and HTTP response formatting
// ABOUTME: Defines AppError, ErrorCode, and the domain error enums that convert into them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every fallible operation in the service returns [`AppResult`]. The error value carries an
//! [`ErrorCode`], a closed enum that callers switch on instead of matching message strings.
//! Domain-specific enums ([`ProviderError`], [`IdTokenError`], [`JwtError`], [`CryptoError`])
//! keep richer context and convert into `AppError` with the matching code.

/// Errors raised by cryptographic primitives
pub mod crypto;
/// Errors raised by identity provider adapters
pub mod provider;
/// Errors raised while validating foreign ID tokens and service JWTs
pub mod token;

pub use crypto::CryptoError;
pub use provider::{ProviderError, ProviderStage};
pub use token::{IdTokenError, JwtError};

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization (1000-1999)
    /// No credentials were presented
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    /// Credentials were presented but are not valid
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    /// The presented token is past its expiry
    #[serde(rename = "AUTH_EXPIRED")]
    AuthExpired = 1002,
    /// The presented token could not be parsed
    #[serde(rename = "AUTH_MALFORMED")]
    AuthMalformed = 1003,
    /// The session lacks a recent step-up proof required for this action
    #[serde(rename = "ELEVATED_CLAIM_REQUIRED")]
    ElevatedClaimRequired = 1004,

    // ID token validation (1100-1199)
    /// Signature did not verify with the provider's key and algorithm
    #[serde(rename = "ID_TOKEN_INVALID_SIGNATURE")]
    IdTokenInvalidSignature = 1100,
    /// Issuer claim does not match the provider
    #[serde(rename = "ID_TOKEN_WRONG_ISSUER")]
    IdTokenWrongIssuer = 1101,
    /// Audience claim matches none of the accepted audiences
    #[serde(rename = "ID_TOKEN_INVALID_AUDIENCE")]
    IdTokenInvalidAudience = 1102,
    /// Issued-at lies in the future
    #[serde(rename = "ID_TOKEN_USED_BEFORE_ISSUED")]
    IdTokenUsedBeforeIssued = 1103,
    /// Expiry is missing or in the past
    #[serde(rename = "ID_TOKEN_EXPIRED")]
    IdTokenExpired = 1104,
    /// Nonce digest does not match the presented nonce
    #[serde(rename = "ID_TOKEN_NONCE_MISMATCH")]
    IdTokenNonceMismatch = 1105,
    /// A claim is present with the wrong type
    #[serde(rename = "ID_TOKEN_MALFORMED_CLAIMS")]
    IdTokenMalformedClaims = 1106,
    /// No validator is configured for the named provider
    #[serde(rename = "UNSUPPORTED_PROVIDER")]
    UnsupportedProvider = 1107,

    // Rate Limiting (2000-2999)
    /// A throttling limiter rejected the request
    #[serde(rename = "RATE_LIMIT_EXCEEDED")]
    RateLimitExceeded = 2000,

    // Validation (3000-3999)
    /// Generic invalid request input
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A required field was absent
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    /// Input had the wrong shape or encoding
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,

    // Resource Management (4000-4999)
    /// Requested resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,

    // External Services (5000-5999)
    /// An upstream service returned an error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// An upstream service could not be reached
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    /// Upstream rejected the presented grant or credentials
    #[serde(rename = "EXTERNAL_AUTH_FAILED")]
    ExternalAuthFailed = 5002,
    /// Upstream throttled the request
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5003,

    // Configuration (6000-6999)
    /// Generic configuration error
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Required configuration is absent
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,
    /// Configuration is present but unusable
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Cryptography (7000-7999)
    /// Ciphertext shorter than the nonce prefix
    #[serde(rename = "CIPHERTEXT_TOO_SHORT")]
    CiphertextTooShort = 7000,
    /// Authentication of the ciphertext failed
    #[serde(rename = "DECRYPTION_FAILED")]
    DecryptionFailed = 7001,
    /// Key is not the required length
    #[serde(rename = "INVALID_KEY_SIZE")]
    InvalidKeySize = 7002,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Encoding or decoding of data failed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput | Self::MissingRequiredField | Self::InvalidFormat => 400,

            Self::AuthRequired
            | Self::AuthInvalid
            | Self::AuthExpired
            | Self::AuthMalformed
            | Self::ElevatedClaimRequired
            | Self::IdTokenInvalidSignature
            | Self::IdTokenWrongIssuer
            | Self::IdTokenInvalidAudience
            | Self::IdTokenUsedBeforeIssued
            | Self::IdTokenExpired
            | Self::IdTokenNonceMismatch
            | Self::IdTokenMalformedClaims => 401,

            Self::ResourceNotFound | Self::UnsupportedProvider => 404,

            Self::RateLimitExceeded => 429,

            Self::ExternalServiceError
            | Self::ExternalServiceUnavailable
            | Self::ExternalAuthFailed => 502,

            Self::ExternalRateLimited => 503,

            Self::InternalError
            | Self::SerializationError
            | Self::ConfigError
            | Self::ConfigMissing
            | Self::ConfigInvalid
            | Self::CiphertextTooShort
            | Self::DecryptionFailed
            | Self::InvalidKeySize => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided authentication credentials are invalid",
            Self::AuthExpired => "The authentication token has expired",
            Self::AuthMalformed => "The authentication token is malformed or corrupted",
            Self::ElevatedClaimRequired => "elevated claim required",
            Self::IdTokenInvalidSignature => "The ID token signature is invalid",
            Self::IdTokenWrongIssuer => "The ID token was issued by an unexpected issuer",
            Self::IdTokenInvalidAudience => "The ID token audience is not accepted",
            Self::IdTokenUsedBeforeIssued => "The ID token was used before it was issued",
            Self::IdTokenExpired => "The ID token has expired",
            Self::IdTokenNonceMismatch => "The ID token nonce does not match",
            Self::IdTokenMalformedClaims => "The ID token claims are malformed",
            Self::UnsupportedProvider => "The identity provider is not supported",
            Self::RateLimitExceeded => "Rate limit exceeded. Please slow down your requests",
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::InvalidFormat => "The data format is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ExternalAuthFailed => "Authentication with external service failed",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigMissing => "Required configuration is missing",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::CiphertextTooShort | Self::DecryptionFailed => "decryption failed",
            Self::InvalidKeySize => "Encryption key has an invalid size",
            Self::InternalError => "An internal server error occurred",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Identity provider involved, if any
    pub provider: Option<String>,
    /// Claim or field that triggered the error
    pub claim: Option<String>,
    /// Request ID for tracing
    pub request_id: Option<String>,
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Attach the identity provider name
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.context.provider = Some(provider.into());
        self
    }

    /// Attach the claim or field name
    #[must_use]
    pub fn with_claim(mut self, claim: impl Into<String>) -> Self {
        self.context.claim = Some(claim.into());
        self
    }

    /// Add a request ID to the error context
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.context.request_id = Some(request_id.into());
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Response body that reveals only the error code and its generic description
    #[must_use]
    pub fn concealed_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorResponseDetails {
                code: self.code,
                message: self.code.description().to_owned(),
                request_id: self.context.request_id.clone(),
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Error payload of an [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine readable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Request ID, when one was attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                request_id: error.context.request_id,
            },
        }
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid authentication
    #[must_use]
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Authentication expired
    #[must_use]
    pub fn auth_expired() -> Self {
        Self::new(ErrorCode::AuthExpired, "Authentication token has expired")
    }

    /// Elevated claim required for a sensitive action
    #[must_use]
    pub fn elevated_claim_required() -> Self {
        Self::new(ErrorCode::ElevatedClaimRequired, "elevated claim required")
    }

    /// Rate limit exceeded for the named limiter
    #[must_use]
    pub fn rate_limit_exceeded(limiter: &str, limit: u64) -> Self {
        Self::new(
            ErrorCode::RateLimitExceeded,
            format!("Rate limit of {limit} requests exceeded for {limiter}"),
        )
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Internal server error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// External service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string())
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use super::{AppError, ErrorResponse};
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http::StatusCode;

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorResponse::from(self))).into_response()
        }
    }

    impl AppError {
        /// Render this error without its detailed message
        #[must_use]
        pub fn into_concealed_response(self) -> Response {
            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(self.concealed_response())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthRequired.http_status(), 401);
        assert_eq!(ErrorCode::ElevatedClaimRequired.http_status(), 401);
        assert_eq!(ErrorCode::RateLimitExceeded.http_status(), 429);
        assert_eq!(ErrorCode::UnsupportedProvider.http_status(), 404);
        assert_eq!(ErrorCode::DecryptionFailed.http_status(), 500);
    }

    #[test]
    fn test_concealed_response_hides_message() {
        let error = AppError::new(ErrorCode::ExternalAuthFailed, "github: bad_verification_code")
            .with_provider("github");
        let concealed = error.concealed_response();
        assert_eq!(concealed.error.code, ErrorCode::ExternalAuthFailed);
        assert!(!concealed.error.message.contains("github"));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::rate_limit_exceeded("brute-force", 10);
        let json = serde_json::to_string(&ErrorResponse::from(error)).unwrap_or_default();
        assert!(json.contains("RATE_LIMIT_EXCEEDED"));
        assert!(json.contains("brute-force"));
    }
}
