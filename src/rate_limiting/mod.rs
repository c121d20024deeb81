// ABOUTME: Request throttling with per-key counting windows over a pluggable store
// ABOUTME: Limiter instances, the store capability, path classification and axum middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate limiting
//!
//! Each [`Limiter`] has a name, a burst and a window. A request is allowed
//! when the post-increment count for its key stays within the burst; the
//! window record is created by the first request and replaced once the
//! window has elapsed. The [`RateLimitStore`] owns the window records and
//! performs the read-increment-write of one key as a single atomic step,
//! locally ([`MemoryRateLimitStore`]) or on a shared Redis
//! ([`RedisRateLimitStore`]).

/// Request path classification
pub mod classifier;
/// In-process window store
pub mod memory;
/// Axum middleware applying the limiter set
pub mod middleware;
/// Redis window store
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

pub use classifier::{PathClass, PathClassifier};
pub use memory::MemoryRateLimitStore;
pub use middleware::{rate_limit_middleware, RateLimitLayerState};
pub use self::redis::RedisRateLimitStore;

use crate::config::{LimitConfig, RateLimitConfig, RateLimitStoreKind};
use crate::errors::{AppError, AppResult};

/// Count for one key after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests counted in the current window, this one included
    pub count: u64,
    /// Time until the current window ends
    pub reset_in: Duration,
}

/// Storage for counting windows
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` in a window of length `interval`
    ///
    /// Starts a new window when none exists or the previous one elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error when a shared store is unreachable
    async fn increment(&self, key: &str, interval: Duration) -> AppResult<WindowCount>;
}

/// Outcome of one limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Burst of the limiter
    pub limit: u64,
    /// Requests left in the window
    pub remaining: u64,
    /// Time until the window resets
    pub retry_after: Duration,
}

/// One named limiter
#[derive(Clone)]
pub struct Limiter {
    name: &'static str,
    limit: u64,
    interval: Duration,
    store: Arc<dyn RateLimitStore>,
}

impl Limiter {
    /// Create a limiter over a store
    #[must_use]
    pub fn new(name: &'static str, config: LimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            name,
            limit: config.burst,
            interval: config.interval,
            store,
        }
    }

    /// Limiter name, also its key namespace in the store
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Burst
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Count a request for `key`
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails
    pub async fn allow(&self, key: &str) -> AppResult<RateLimitDecision> {
        let window = self
            .store
            .increment(&format!("{}:{key}", self.name), self.interval)
            .await?;
        Ok(RateLimitDecision {
            allowed: window.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            retry_after: window.reset_in,
        })
    }

    /// Count a request and turn a rejection into an error
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` when the burst is used up
    pub async fn check(&self, key: &str) -> AppResult<RateLimitDecision> {
        let decision = self.allow(key).await?;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(AppError::rate_limit_exceeded(self.name, self.limit))
        }
    }
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Every limiter the middleware applies
#[derive(Debug, Clone)]
pub struct Limiters {
    /// Every request, per client
    pub global: Limiter,
    /// Requests that send email
    pub email: Limiter,
    /// Requests that send SMS
    pub sms: Limiter,
    /// Sign-in, verification and OTP
    pub brute_force: Limiter,
    /// Signups
    pub signups: Limiter,
    /// Token and introspection calls
    pub oauth2_server: Limiter,
}

impl Limiters {
    /// Build all limiters over one store
    #[must_use]
    pub fn new(config: &RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            global: Limiter::new("global", config.global, Arc::clone(&store)),
            email: Limiter::new("email", config.email, Arc::clone(&store)),
            sms: Limiter::new("sms", config.sms, Arc::clone(&store)),
            brute_force: Limiter::new("brute_force", config.brute_force, Arc::clone(&store)),
            signups: Limiter::new("signups", config.signups, Arc::clone(&store)),
            oauth2_server: Limiter::new("oauth2_server", config.oauth2_server, store),
        }
    }
}

/// Create the store selected by configuration
///
/// # Errors
///
/// Returns a configuration error when Redis is selected without a URL, or
/// an internal error when Redis is unreachable
pub async fn create_store(config: &RateLimitConfig) -> AppResult<Arc<dyn RateLimitStore>> {
    match config.store {
        RateLimitStoreKind::Memory => {
            info!("Rate limiting with in-memory windows");
            Ok(Arc::new(MemoryRateLimitStore::new()))
        }
        RateLimitStoreKind::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| AppError::config("AUTH_RATE_LIMIT_REDIS_URL is required"))?;
            let store = RedisRateLimitStore::connect(url, &config.key_prefix).await?;
            Ok(Arc::new(store))
        }
    }
}
