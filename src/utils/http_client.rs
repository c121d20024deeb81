// ABOUTME: Shared HTTP client utilities with connection pooling and timeout configuration
// ABOUTME: Provides the bounded-timeout clients used for provider, key-set and claims calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::network::{
    CLAIMS_TIMEOUT_SECS, PROVIDER_CONNECT_TIMEOUT_SECS, PROVIDER_TIMEOUT_SECS,
};
use reqwest::{Client, ClientBuilder};
use std::sync::OnceLock;
use std::time::Duration;

/// Global shared HTTP client for identity provider calls
static PROVIDER_CLIENT: OnceLock<Client> = OnceLock::new();

/// Create a new HTTP client with custom timeout settings
///
/// Falls back to a default client if the builder fails.
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .user_agent(concat!("federated-auth/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Shared client for token exchange, profile fetch and key-set fetch
///
/// Every request carries a bounded timeout. Dropping the calling future
/// aborts the in-flight request, so cancellation of the parent request
/// propagates without extra plumbing.
pub fn provider_client() -> &'static Client {
    PROVIDER_CLIENT.get_or_init(|| {
        create_client_with_timeout(PROVIDER_TIMEOUT_SECS, PROVIDER_CONNECT_TIMEOUT_SECS)
    })
}

/// Client for the custom claims data API
#[must_use]
pub fn claims_client() -> Client {
    create_client_with_timeout(CLAIMS_TIMEOUT_SECS, PROVIDER_CONNECT_TIMEOUT_SECS)
}
