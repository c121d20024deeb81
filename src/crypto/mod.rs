// ABOUTME: Cryptography module providing authenticated encryption of secrets at rest
// ABOUTME: Centralizes symmetric encryption used for stored credentials
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Cryptographic utilities

/// AES-256-GCM encryption with random nonces
pub mod encryption;

pub use encryption::{Encrypter, KEY_SIZE, NONCE_SIZE};
