// ABOUTME: Tests for AES-256-GCM encryption of secrets at rest
// ABOUTME: Nonce freshness, wrong-key and tamper detection, and error codes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use federated_auth::crypto::{Encrypter, NONCE_SIZE};
use federated_auth::errors::{AppError, CryptoError, ErrorCode};

#[test]
fn test_same_plaintext_encrypts_differently() {
    let encrypter = Encrypter::generate();
    let a = encrypter.encrypt(b"refresh-token").unwrap();
    let b = encrypter.encrypt(b"refresh-token").unwrap();
    assert_ne!(a, b);
    assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    assert_eq!(encrypter.decrypt(&a).unwrap(), b"refresh-token");
    assert_eq!(encrypter.decrypt(&b).unwrap(), b"refresh-token");
}

#[test]
fn test_empty_plaintext() {
    let encrypter = Encrypter::generate();
    let sealed = encrypter.encrypt(b"").unwrap();
    assert_eq!(sealed.len(), NONCE_SIZE + 16);
    assert!(encrypter.decrypt(&sealed).unwrap().is_empty());
}

#[test]
fn test_non_ascii_plaintext() {
    let encrypter = Encrypter::generate();
    let plaintext = "Zoë Müller 東京 🔑".as_bytes();
    let sealed = encrypter.encrypt(plaintext).unwrap();
    assert_eq!(encrypter.decrypt(&sealed).unwrap(), plaintext);

    let binary: Vec<u8> = (0..=255).collect();
    let sealed = encrypter.encrypt(&binary).unwrap();
    assert_eq!(encrypter.decrypt(&sealed).unwrap(), binary);
}

#[test]
fn test_wrong_key_fails() {
    let sealed = Encrypter::generate().encrypt(b"otp-seed").unwrap();
    assert_eq!(
        Encrypter::generate().decrypt(&sealed).unwrap_err(),
        CryptoError::DecryptionFailed
    );
}

#[test]
fn test_tampered_ciphertext_fails() {
    let encrypter = Encrypter::generate();
    let mut sealed = encrypter.encrypt(b"otp-seed").unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;
    assert_eq!(
        encrypter.decrypt(&sealed).unwrap_err(),
        CryptoError::DecryptionFailed
    );
}

#[test]
fn test_short_input_fails() {
    let encrypter = Encrypter::generate();
    let err = encrypter.decrypt(&[0u8; NONCE_SIZE - 1]).unwrap_err();
    assert_eq!(err, CryptoError::TooShort);

    let app: AppError = err.into();
    assert_eq!(app.code, ErrorCode::CiphertextTooShort);
    assert_eq!(app.message, "decryption failed");
}

#[test]
fn test_hex_keys() {
    assert!(Encrypter::from_hex("not-hex").is_err());
    assert!(Encrypter::from_hex(&"00".repeat(16)).is_err());

    let key = "1f".repeat(32);
    let a = Encrypter::from_hex(&key).unwrap();
    let b = Encrypter::from_hex(&format!(" {key}\n")).unwrap();
    let sealed = a.encrypt(b"shared").unwrap();
    assert_eq!(b.decrypt(&sealed).unwrap(), b"shared");
}
