// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides fixture loading, token minting and configured service helpers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `federated_auth`

use std::path::PathBuf;
use std::sync::{Arc, Once};
use std::time::Duration;

use federated_auth::config::ElevatedClaimMode;
use federated_auth::jwt::JwtGetter;
use federated_auth::users::{MemoryUsersStore, UsersStore};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// Key id of the fixture key published in `fixtures/jwks.json`
pub const FIXTURE_KID: &str = "test-key-1";

/// HS256 key used for service tokens in tests
pub const TEST_HS256_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Read a file from `tests/fixtures`
pub fn fixture(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect();
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}

/// Sign claims with an RSA fixture key
pub fn sign_rs256(claims: &Value, kid: Option<&str>, private_key_fixture: &str) -> String {
    let key = EncodingKey::from_rsa_pem(fixture(private_key_fixture).as_bytes()).unwrap();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(ToOwned::to_owned);
    encode(&header, claims, &key).unwrap()
}

/// Sign claims with the fixture key whose public half is in `jwks.json`
pub fn sign_with_fixture_key(claims: &Value) -> String {
    sign_rs256(claims, Some(FIXTURE_KID), "rsa_private.pem")
}

/// HS256 service secret JSON
pub fn hs256_secret() -> String {
    json!({"type": "HS256", "key": TEST_HS256_KEY}).to_string()
}

/// RS256 service secret JSON built from the fixture keys
pub fn rs256_secret() -> String {
    json!({
        "type": "RS256",
        "key": fixture("rsa_public.pem"),
        "signing_key": fixture("rsa_private.pem"),
        "kid": FIXTURE_KID,
    })
    .to_string()
}

/// JWT getter over an HS256 secret and a fresh in-memory user store
pub fn test_jwt_getter(mode: ElevatedClaimMode) -> (JwtGetter, Arc<MemoryUsersStore>) {
    let users = Arc::new(MemoryUsersStore::new());
    let store: Arc<dyn UsersStore> = users.clone();
    let getter = JwtGetter::new(
        &hs256_secret(),
        Duration::from_secs(900),
        None,
        mode,
        store,
    )
    .unwrap();
    (getter, users)
}

/// Current unix time
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
