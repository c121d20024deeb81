// ABOUTME: AES-256-GCM encryption with a random 96-bit nonce prefixed to the ciphertext
// ABOUTME: Used for secrets stored at rest such as TOTP seeds and provider refresh tokens
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::CryptoError;

/// Required key length in bytes
pub const KEY_SIZE: usize = 32;

/// Nonce length in bytes, stored in front of every ciphertext
pub const NONCE_SIZE: usize = 12;

/// Symmetric encrypter bound to one 256-bit key.
///
/// Output layout is `nonce || ciphertext || tag`. A fresh random nonce is drawn
/// per call, so encrypting the same plaintext twice yields different output.
pub struct Encrypter {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl Encrypter {
    /// Create an encrypter from raw key bytes
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeySize`] unless the key is exactly 32 bytes
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| CryptoError::InvalidKeySize {
            expected: KEY_SIZE,
            actual: key.len(),
        })?;
        Ok(Self {
            key: Zeroizing::new(key),
        })
    }

    /// Create an encrypter from a hex-encoded key
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeySize`] if the input is not 64 hex characters
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex::decode(encoded.trim()).map_err(|_| {
            CryptoError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: encoded.len() / 2,
            }
        })?);
        Self::new(&bytes)
    }

    /// Generate a random key, for development and tests
    #[must_use]
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        rand::thread_rng().fill_bytes(&mut key[..]);
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.key[..]))
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext`
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if the cipher rejects the input
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by [`Encrypter::encrypt`]
    ///
    /// # Errors
    ///
    /// - [`CryptoError::TooShort`] if the input cannot hold a nonce
    /// - [`CryptoError::DecryptionFailed`] for a wrong key or tampered data
    pub fn decrypt(&self, encrypted: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if encrypted.len() < NONCE_SIZE {
            return Err(CryptoError::TooShort);
        }
        let (nonce, ciphertext) = encrypted.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_key_size() {
        assert_eq!(
            Encrypter::new(&[0u8; 16]).err(),
            Some(CryptoError::InvalidKeySize {
                expected: 32,
                actual: 16
            })
        );
    }

    #[test]
    fn test_from_hex_round_trip() {
        let encrypter = Encrypter::from_hex(&"ab".repeat(32)).unwrap();
        let sealed = encrypter.encrypt(b"otp-seed").unwrap();
        assert_eq!(encrypter.decrypt(&sealed).unwrap(), b"otp-seed");
    }
}
