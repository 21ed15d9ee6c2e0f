//! Per-host token bucket rate limiting.
//!
//! Every outgoing request takes one token from the bucket of its host.
//! Buckets refill continuously at the configured rate up to the burst size.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Refill rate and capacity of one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    /// Tokens added per second.
    pub per_second: f64,
    /// Maximum number of tokens held.
    pub burst: u32,
}

impl Rate {
    pub const fn new(per_second: f64, burst: u32) -> Self {
        Self { per_second, burst }
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::new(2.0, 4)
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
    rate: Rate,
}

impl Bucket {
    fn new(rate: Rate, now: Instant) -> Self {
        Self {
            tokens: f64::from(rate.burst.max(1)),
            last: now,
            rate,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        let cap = f64::from(self.rate.burst.max(1));
        self.tokens = (self.tokens + elapsed * self.rate.per_second).min(cap);
        self.last = now;
    }
}

/// Token buckets keyed by host name.
#[derive(Debug, Default)]
pub struct RateLimiter {
    default_rate: Rate,
    host_rates: HashMap<String, Rate>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(default_rate: Rate) -> Self {
        Self {
            default_rate,
            ..Default::default()
        }
    }

    /// Use a different rate for one host.
    pub fn with_host_rate(mut self, host: &str, rate: Rate) -> Self {
        self.host_rates.insert(host.to_ascii_lowercase(), rate);
        self
    }

    /// Block until a token for `host` is available, then take it.
    pub fn acquire(&self, host: &str) {
        while let Some(wait) = self.try_acquire(host, Instant::now()) {
            tracing::trace!(host, ?wait, "rate limit wait");
            thread::sleep(wait);
        }
    }

    /// Take a token if one is available at `now`; otherwise return how long
    /// to wait before one will be.
    fn try_acquire(&self, host: &str, now: Instant) -> Option<Duration> {
        let key = host.to_ascii_lowercase();
        let rate = self
            .host_rates
            .get(&key)
            .copied()
            .unwrap_or(self.default_rate);
        if rate.per_second <= 0.0 {
            return None;
        }

        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(rate, now));
        bucket.refill(now);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let missing = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(missing / rate.per_second))
        }
    }
}
