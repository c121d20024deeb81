// ABOUTME: Encryption commands for federated-auth-cli
// ABOUTME: Hex in, hex out, keyed by --encryption-key or AUTH_ENCRYPTION_KEY
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::env;

use anyhow::{anyhow, Context, Result};
use federated_auth::crypto::Encrypter;

const KEY_VAR: &str = "AUTH_ENCRYPTION_KEY";

fn encrypter(key: Option<&str>) -> Result<Encrypter> {
    let key = match key {
        Some(key) => key.to_owned(),
        None => env::var(KEY_VAR).map_err(|_| anyhow!("--encryption-key or {KEY_VAR} is required"))?,
    };
    Ok(Encrypter::from_hex(&key)?)
}

/// Encrypt `plaintext` and print the hex ciphertext
pub fn encrypt(key: Option<&str>, plaintext: &str) -> Result<()> {
    let encrypted = encrypter(key)?.encrypt(plaintext.as_bytes())?;
    println!("{}", hex::encode(encrypted));
    Ok(())
}

/// Decrypt a hex ciphertext and print the plaintext
pub fn decrypt(key: Option<&str>, ciphertext: &str) -> Result<()> {
    let bytes = hex::decode(ciphertext.trim()).context("ciphertext is not valid hex")?;
    let plaintext = encrypter(key)?.decrypt(&bytes)?;
    println!(
        "{}",
        String::from_utf8(plaintext).context("plaintext is not UTF-8")?
    );
    Ok(())
}
