// ABOUTME: Redis-backed rate-limit window store shared across server replicas
// ABOUTME: A server-side script increments the counter and arms its expiry in one round trip
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::Script;
use tracing::{info, warn};

use super::{RateLimitStore, WindowCount};
use crate::errors::{AppError, AppResult};

/// Connection attempts before giving up at startup
const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// `INCR`, then set the window expiry on the first hit or when it is missing.
/// Returns `{count, pttl}`.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if count == 1 or ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Window store on a shared Redis
#[derive(Clone)]
pub struct RedisRateLimitStore {
    manager: ConnectionManager,
    prefix: String,
    script: Script,
}

impl RedisRateLimitStore {
    /// Connect to Redis, retrying briefly
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid URL or an internal error
    /// when no connection could be established
    pub async fn connect(redis_url: &str, prefix: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::config(format!("invalid Redis URL: {e}")))?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(5))
            .set_response_timeout(Duration::from_secs(2));

        let mut delay = CONNECT_RETRY_DELAY;
        let mut attempt = 1;
        loop {
            match ConnectionManager::new_with_config(client.clone(), config.clone()).await {
                Ok(manager) => {
                    info!(attempt, "Rate limiting with Redis windows");
                    return Ok(Self::with_manager(manager, prefix));
                }
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!(attempt, error = %e, "Redis connection failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::internal(format!(
                        "failed to connect to Redis after {CONNECT_ATTEMPTS} attempts: {e}"
                    )));
                }
            }
        }
    }

    /// Wrap an existing connection manager
    #[must_use]
    pub fn with_manager(manager: ConnectionManager, prefix: &str) -> Self {
        Self {
            manager,
            prefix: prefix.to_owned(),
            script: Script::new(INCREMENT_SCRIPT),
        }
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn increment(&self, key: &str, interval: Duration) -> AppResult<WindowCount> {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.manager.clone();
        let (count, ttl_ms): (u64, i64) = self
            .script
            .key(self.build_key(key))
            .arg(interval_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::internal(format!("Redis rate-limit increment failed: {e}")))?;

        Ok(WindowCount {
            count,
            reset_in: Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0)),
        })
    }
}

impl std::fmt::Debug for RedisRateLimitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimitStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
