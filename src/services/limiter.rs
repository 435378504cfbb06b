// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client login attempt limiting.
//!
//! Fixed window counter per client key (usually the forwarded client IP).
//! State lives in this process only; each instance limits independently.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Attempts allowed per window.
pub const LOGIN_ATTEMPTS_PER_WINDOW: u32 = 10;
/// Window length.
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);
/// Prune stale entries once the map grows past this size.
const CLEANUP_THRESHOLD: usize = 10_000;

/// Login attempt limiter keyed by client.
#[derive(Clone)]
pub struct LoginLimiter {
    /// client -> (attempts in window, window start)
    attempts: Arc<DashMap<String, (u32, Instant)>>,
    limit: u32,
    window: Duration,
}

impl LoginLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            limit,
            window,
        }
    }

    /// Record an attempt. Returns `false` when the client is over its limit.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let allowed = {
            let mut entry = self
                .attempts
                .entry(client.to_string())
                .or_insert((0, now));
            let (count, window_start) = entry.value_mut();

            if now.duration_since(*window_start) >= self.window {
                *count = 0;
                *window_start = now;
            }

            if *count >= self.limit {
                false
            } else {
                *count += 1;
                true
            }
        };

        if self.attempts.len() > CLEANUP_THRESHOLD {
            let window = self.window;
            self.attempts
                .retain(|_, (_, start)| now.duration_since(*start) < window);
        }

        allowed
    }
}

impl Default for LoginLimiter {
    fn default() -> Self {
        Self::new(LOGIN_ATTEMPTS_PER_WINDOW, LOGIN_WINDOW)
    }
}
