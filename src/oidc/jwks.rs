// ABOUTME: Cached fetcher for a provider's published signing keys (JWKS)
// ABOUTME: Refreshes on schedule and on unknown key ids, keeping last-known-good keys on failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! JWKS cache
//!
//! Refresh policy:
//! - keys are served from memory until the endpoint's `max-age` (floored at
//!   five minutes, one hour when absent) elapses
//! - an unknown key id forces a refetch, at most once per minimum refetch interval
//! - one fetch runs at a time; callers that waited on it reuse its outcome,
//!   including a failure, instead of fetching again
//! - failed fetches are retried at most once per minimum refetch interval
//! - when a fetch fails, the previous key set stays in use

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::oidc::{DEFAULT_KEYS_TTL_SECS, MIN_KEYS_TTL_SECS, MIN_REFETCH_INTERVAL_SECS};
use crate::errors::IdTokenError;
use crate::utils::http_client::provider_client;

/// Timing policy for a [`JwksCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Lifetime when the endpoint sends no `max-age`
    pub default_ttl: Duration,
    /// Floor applied to any `max-age`
    pub min_ttl: Duration,
    /// Minimum spacing between fetches forced by unknown key ids or
    /// retrying a failed fetch
    pub min_refetch_interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_KEYS_TTL_SECS),
            min_ttl: Duration::from_secs(MIN_KEYS_TTL_SECS),
            min_refetch_interval: Duration::from_secs(MIN_REFETCH_INTERVAL_SECS),
        }
    }
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    expires_at: Instant,
}

impl CachedKeys {
    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            // a token without kid is only usable against a single-key set
            None if self.keys.len() == 1 => self.keys.values().next().cloned(),
            None => None,
        }
    }
}

#[derive(Default)]
struct FetchState {
    completed_at: Option<Instant>,
    error: Option<IdTokenError>,
}

/// Shared, auto-refreshing key set for one provider
pub struct JwksCache {
    url: String,
    client: Client,
    policy: RefreshPolicy,
    cached: Arc<RwLock<Option<CachedKeys>>>,
    fetch_state: Mutex<FetchState>,
}

impl JwksCache {
    /// Create a cache for `url` with the default policy
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_policy(url, RefreshPolicy::default())
    }

    /// Create a cache with an explicit refresh policy
    #[must_use]
    pub fn with_policy(url: impl Into<String>, policy: RefreshPolicy) -> Self {
        Self {
            url: url.into(),
            client: provider_client().clone(),
            policy,
            cached: Arc::new(RwLock::new(None)),
            fetch_state: Mutex::new(FetchState::default()),
        }
    }

    /// Key set endpoint
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn cached_key(&self, kid: Option<&str>, require_fresh: bool) -> Option<DecodingKey> {
        let cache = self.cached.read().await;
        cache.as_ref().and_then(|cached| {
            if require_fresh && cached.expires_at <= Instant::now() {
                None
            } else {
                cached.lookup(kid)
            }
        })
    }

    async fn is_fresh(&self) -> bool {
        self.cached
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.expires_at > Instant::now())
    }

    /// Resolve the verification key for a token's key id
    ///
    /// # Errors
    ///
    /// Returns [`IdTokenError::UnknownKey`] when no key matches, or
    /// [`IdTokenError::KeyResolution`] when keys were never fetched successfully
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey, IdTokenError> {
        if let Some(key) = self.cached_key(kid, true).await {
            return Ok(key);
        }

        // Single flight: whoever holds this lock fetches, everyone else re-reads after
        let waiting_since = Instant::now();
        let mut state = self.fetch_state.lock().await;
        if let Some(key) = self.cached_key(kid, true).await {
            return Ok(key);
        }

        if state.completed_at.is_some_and(|at| at > waiting_since) {
            debug!(url = %self.url, kid = ?kid, "Reusing outcome of concurrent key fetch");
            return self.last_outcome(kid, &state).await;
        }

        let throttled = state
            .completed_at
            .is_some_and(|at| at.elapsed() < self.policy.min_refetch_interval);
        if throttled && (state.error.is_some() || self.is_fresh().await) {
            debug!(url = %self.url, kid = ?kid, "Key refetch throttled");
            return self.last_outcome(kid, &state).await;
        }

        let result = self.fetch().await;
        state.completed_at = Some(Instant::now());
        match result {
            Ok((keys, ttl)) => {
                state.error = None;
                let count = keys.len();
                let cached = CachedKeys {
                    keys,
                    expires_at: Instant::now() + ttl,
                };
                let key = cached.lookup(kid);
                *self.cached.write().await = Some(cached);
                info!(url = %self.url, num_keys = count, ttl_secs = ttl.as_secs(), "Signing keys cached");
                key.ok_or_else(|| unknown_key(kid))
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Key refresh failed");
                state.error = Some(e);
                self.last_outcome(kid, &state).await
            }
        }
    }

    /// Answer from whatever the most recent fetch left behind
    async fn last_outcome(
        &self,
        kid: Option<&str>,
        state: &FetchState,
    ) -> Result<DecodingKey, IdTokenError> {
        // keep serving the last-known-good set
        if let Some(key) = self.cached_key(kid, false).await {
            return Ok(key);
        }
        if self.cached.read().await.is_some() {
            return Err(unknown_key(kid));
        }
        Err(state.error.clone().unwrap_or_else(|| unknown_key(kid)))
    }

    async fn fetch(&self) -> Result<(HashMap<String, DecodingKey>, Duration), IdTokenError> {
        debug!(url = %self.url, "Fetching signing keys");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| IdTokenError::KeyResolution(format!("failed to fetch keys: {e}")))?;

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .map_or(self.policy.default_ttl, Duration::from_secs)
            .max(self.policy.min_ttl);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| IdTokenError::KeyResolution(format!("failed to parse keys: {e}")))?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in &set.keys {
            let kid = jwk.common.key_id.clone().unwrap_or_default();
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable signing key"),
            }
        }

        if keys.is_empty() {
            return Err(IdTokenError::KeyResolution("no usable signing keys".to_owned()));
        }
        Ok((keys, ttl))
    }
}

fn unknown_key(kid: Option<&str>) -> IdTokenError {
    IdTokenError::UnknownKey {
        kid: kid.unwrap_or_default().to_owned(),
    }
}

/// Parse max-age value from Cache-Control header
///
/// Example: "public, max-age=3600, must-revalidate" -> 3600
fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|s| s.strip_prefix("max-age="))
        .and_then(|s| s.parse().ok())
}
