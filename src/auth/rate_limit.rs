//! Fixed-window request counter keyed by client identity
//!
//! Single-process only: several instances behind a balancer each keep their
//! own counters. Entries are never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::clock::Clock;
use crate::config::rate_limit::{MAX_REQUESTS, WINDOW_SECS};

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: i64,
}

/// Per-identity fixed-window limiter
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window_ms: i64,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window_ms: window_secs as i64 * 1000,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 100 requests per 60 seconds
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(MAX_REQUESTS, WINDOW_SECS, clock)
    }

    pub fn window_secs(&self) -> u64 {
        (self.window_ms / 1000) as u64
    }

    /// Count a request and report whether it is within the limit
    pub async fn allow(&self, identity: &str) -> bool {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(identity) {
            if now <= entry.reset_at {
                entry.count = entry.count.saturating_add(1);
                return entry.count <= self.max_requests;
            }
        }

        entries.insert(
            identity.to_string(),
            RateLimitEntry {
                count: 1,
                reset_at: now + self.window_ms,
            },
        );
        true
    }
}
