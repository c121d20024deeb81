// ABOUTME: In-process rate-limit window store for single-instance deployments
// ABOUTME: Per-key atomic increments through the concurrent map's entry lock
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use super::{RateLimitStore, WindowCount};
use crate::errors::AppResult;

/// Increments between sweeps of elapsed windows
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    interval: Duration,
    count: u64,
}

impl Window {
    fn new(now: Instant, interval: Duration) -> Self {
        Self {
            started_at: now,
            interval,
            count: 0,
        }
    }

    fn is_elapsed(&self, now: Instant) -> bool {
        now.duration_since(self.started_at) >= self.interval
    }
}

/// Window store held in process memory
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    windows: DashMap<String, Window>,
    increments: AtomicU64,
}

impl MemoryRateLimitStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no key is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every window that has elapsed
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| !window.is_elapsed(now));
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "Purged elapsed rate-limit windows");
        }
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(&self, key: &str, interval: Duration) -> AppResult<WindowCount> {
        if self.increments.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }

        let now = Instant::now();
        // the entry guard holds the shard lock across read, reset and increment
        let mut entry = self
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| Window::new(now, interval));
        if entry.is_elapsed(now) {
            *entry = Window::new(now, interval);
        }
        entry.count += 1;

        let reset_in = entry
            .interval
            .saturating_sub(now.duration_since(entry.started_at));
        Ok(WindowCount {
            count: entry.count,
            reset_in,
        })
    }
}
