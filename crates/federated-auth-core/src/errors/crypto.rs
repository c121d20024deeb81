// ABOUTME: Error types for symmetric encryption of secrets at rest
// ABOUTME: Keeps failure kinds distinct internally while exposing an information-minimal message
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{AppError, ErrorCode};
use thiserror::Error;

/// Encryption and decryption failures.
///
/// The display text never says why decryption failed; the variant does.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key is not 32 bytes
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Required key length
        expected: usize,
        /// Supplied key length
        actual: usize,
    },

    /// Input shorter than the nonce prefix
    #[error("decryption failed")]
    TooShort,

    /// Wrong key or tampered ciphertext
    #[error("decryption failed")]
    DecryptionFailed,

    /// The cipher refused to encrypt
    #[error("encryption failed")]
    EncryptionFailed,
}

impl From<CryptoError> for AppError {
    fn from(error: CryptoError) -> Self {
        let code = match error {
            CryptoError::InvalidKeySize { .. } => ErrorCode::InvalidKeySize,
            CryptoError::TooShort => ErrorCode::CiphertextTooShort,
            CryptoError::DecryptionFailed => ErrorCode::DecryptionFailed,
            CryptoError::EncryptionFailed => ErrorCode::InternalError,
        };
        Self::new(code, error.to_string())
    }
}
