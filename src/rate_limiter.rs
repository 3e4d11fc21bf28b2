//! Token-bucket rate limiting for platform API budgets.
//!
//! Each key owns a bucket holding at most `capacity` tokens. Tokens flow back
//! continuously at `capacity / period` per second, so a partially drained
//! bucket refills fractionally rather than in discrete slots. An allowed call
//! consumes one token and adds its `cost` to a per-key running total.
//!
//! `check` never blocks: it reports a decision and leaves waiting or retrying
//! to the caller.

use crate::clock::{self, Clock};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    /// Available tokens, within `[0, capacity]`.
    allowance: f64,
    last_check: f64,
    cost: f64,
}

/// Per-key token-bucket rate limiter.
pub struct RateLimiter {
    capacity: f64,
    /// Tokens replenished per second.
    refill_rate: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Allow `capacity` calls per `period`, using the system clock.
    #[must_use]
    pub fn new(capacity: u32, period: Duration) -> Self {
        Self::with_clock(capacity, period, clock::system())
    }

    /// Allow `capacity` calls per `period`, reading time from `clock`.
    #[must_use]
    pub fn with_clock(capacity: u32, period: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = f64::from(capacity);
        let period = period.as_secs_f64();
        let refill_rate = if period > 0.0 {
            capacity / period
        } else {
            f64::INFINITY
        };

        Self {
            capacity,
            refill_rate,
            buckets: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Decide whether a call for `key` may proceed.
    ///
    /// Replenishes the bucket for the time elapsed since the last check, then
    /// consumes one token and records `cost` if at least one is available.
    /// A denied check still records the replenishment.
    pub fn check(&self, key: &str, cost: f64) -> bool {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            allowance: self.capacity,
            last_check: now,
            cost: 0.0,
        });

        let elapsed = (now - bucket.last_check).max(0.0);
        bucket.allowance = if self.refill_rate.is_finite() {
            elapsed
                .mul_add(self.refill_rate, bucket.allowance)
                .min(self.capacity)
        } else {
            self.capacity
        };
        bucket.last_check = now;

        if bucket.allowance < 1.0 {
            debug!(
                "Rate limit reached for {} (allowance {:.3})",
                key, bucket.allowance
            );
            return false;
        }

        bucket.allowance -= 1.0;
        bucket.cost += cost;
        true
    }

    /// Like [`check`](Self::check), but reports a denial as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] when no token is available.
    pub fn acquire(&self, key: &str, cost: f64) -> Result<()> {
        if self.check(key, cost) {
            Ok(())
        } else {
            Err(Error::RateLimited(key.to_string()))
        }
    }

    /// Accumulated cost of allowed calls for `key`.
    #[must_use]
    pub fn get_cost(&self, key: &str) -> f64 {
        self.buckets.lock().get(key).map_or(0.0, |b| b.cost)
    }

    /// Allowance recorded at the last check for `key`.
    ///
    /// Keys never checked report a full bucket.
    #[must_use]
    pub fn allowance(&self, key: &str) -> f64 {
        self.buckets
            .lock()
            .get(key)
            .map_or(self.capacity, |b| b.allowance)
    }

    /// Bucket capacity.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
