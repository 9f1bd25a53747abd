//! Fixed-window request counting keyed by `ip:path`.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Seconds until the current window resets (at least 1).
    Limited { retry_after_secs: u64 },
}

/// Counter store behind the rate limiter. Swappable for a shared
/// store when running more than one instance.
pub trait RateLimitStore: Send + Sync {
    /// Count one request against `key` and say whether it may proceed.
    fn hit(&self, key: &str, now: DateTime<Utc>) -> RateDecision;

    /// Drop windows that ended before `now`.
    fn prune(&self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

/// In-process store. Counters are lost on restart.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl InMemoryRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::seconds(config.window_secs as i64),
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for InMemoryRateLimiter {
    fn hit(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now >= entry.started + self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            // Round up so waiting the advertised time always clears the window.
            let remaining_ms = (entry.started + self.window - now).num_milliseconds();
            return RateDecision::Limited {
                retry_after_secs: ((remaining_ms + 999) / 1000).max(1) as u64,
            };
        }

        entry.count += 1;
        RateDecision::Allowed
    }

    fn prune(&self, now: DateTime<Utc>) {
        self.windows.retain(|_, w| now < w.started + self.window);
    }
}
