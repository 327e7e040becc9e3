//! Rate limiting for IPC clients
//!
//! The popup polls the daemon every second; a misbehaving client could do a
//! lot worse. Each client gets a token bucket refilled at a fixed interval.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Simple per-client token-bucket rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    max_tokens: u32,
    refill_interval: Duration,
    buckets: HashMap<ClientId, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// `max_requests` requests allowed per `interval`, per client.
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_tokens: max_requests,
            refill_interval: interval,
            buckets: HashMap::new(),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate limited.
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        let now = Instant::now();

        let bucket = self.buckets.entry(client_id.clone()).or_insert(Bucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill);
        if elapsed >= self.refill_interval {
            bucket.tokens = self.max_tokens;
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Drop a disconnected client's bucket.
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.buckets.remove(client_id);
    }

    /// Drop buckets that have seen no refill for `stale_after`.
    pub fn cleanup(&mut self, stale_after: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < stale_after);
    }
}
