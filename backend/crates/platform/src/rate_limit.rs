//! Rate Limiting Infrastructure
//!
//! Per-client token bucket limiter kept in process memory.
//!
//! Each key (normally the client IP) owns a bucket holding up to `burst`
//! tokens. Tokens refill continuously at `max_requests / window` per second
//! and every admitted request consumes one. Buckets are spread across
//! [`SHARD_COUNT`] independently locked maps so unrelated clients never wait
//! on each other, and buckets idle for longer than `idle_ttl` are swept out.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Number of lock shards
pub const SHARD_COUNT: usize = 16;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests replenished per window
    pub max_requests: u32,
    /// Refill window
    pub window: Duration,
    /// Bucket capacity (maximum burst)
    pub burst: u32,
    /// Buckets untouched for this long are evicted
    pub idle_ttl: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(10, 60)
    }
}

impl RateLimitConfig {
    /// `burst` defaults to `max_requests`, idle TTL to ten windows
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        let window = Duration::from_secs(window_secs.max(1));
        Self {
            max_requests,
            window,
            burst: max_requests,
            idle_ttl: window.saturating_mul(10),
        }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    /// Tokens regained per second
    fn refill_per_sec(&self) -> f64 {
        f64::from(self.max_requests) / self.window.as_secs_f64()
    }
}

/// Outcome of a single limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Whole tokens left after this request
    pub remaining: u32,
    /// How long until one token is available again (zero when allowed)
    pub retry_after: Duration,
}

impl RateLimitDecision {
    /// `retry_after` rounded up to whole seconds, never below one
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let rounded = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

#[derive(Debug)]
struct Shard {
    buckets: HashMap<String, Bucket>,
    last_sweep: Instant,
}

/// Sharded token bucket limiter
#[derive(Debug)]
pub struct TokenBucketLimiter {
    config: RateLimitConfig,
    shards: Vec<Mutex<Shard>>,
}

impl TokenBucketLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let now = Instant::now();
        let shards = (0..SHARD_COUNT)
            .map(|_| {
                Mutex::new(Shard {
                    buckets: HashMap::new(),
                    last_sweep: now,
                })
            })
            .collect();

        Self { config, shards }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Consume one token for `key` if available
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).allowed
    }

    /// Consume one token for `key` and report the bucket state
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Number of tracked buckets across all shards
    pub fn tracked_keys(&self) -> usize {
        self.shards.iter().map(|s| s.lock().buckets.len()).sum()
    }

    fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let capacity = f64::from(self.config.burst);
        let rate = self.config.refill_per_sec();

        if self.config.burst == 0 || rate <= 0.0 {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after: self.config.window,
            };
        }

        let mut guard = self.shard_for(key).lock();
        let shard = &mut *guard;

        // Periodic sweep: drop buckets nobody has touched recently
        if now.saturating_duration_since(shard.last_sweep) >= self.config.window {
            let idle_ttl = self.config.idle_ttl;
            let before = shard.buckets.len();
            shard
                .buckets
                .retain(|_, bucket| now.saturating_duration_since(bucket.refilled_at) < idle_ttl);
            shard.last_sweep = now;

            let evicted = before - shard.buckets.len();
            if evicted > 0 {
                tracing::trace!(evicted, remaining = shard.buckets.len(), "Evicted idle rate limit buckets");
            }
        }

        let bucket = shard.buckets.entry(key.to_owned()).or_insert(Bucket {
            tokens: capacity,
            refilled_at: now,
        });

        let elapsed = now.saturating_duration_since(bucket.refilled_at);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision {
                allowed: true,
                remaining: bucket.tokens.floor() as u32,
                retry_after: Duration::ZERO,
            }
        } else {
            let missing = 1.0 - bucket.tokens;
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after: Duration::try_from_secs_f64(missing / rate).unwrap_or(self.config.window),
            }
        }
    }

    #[cfg(test)]
    fn sweep_at(&self, now: Instant) {
        let idle_ttl = self.config.idle_ttl;
        for shard in &self.shards {
            let mut shard = shard.lock();
            shard
                .buckets
                .retain(|_, bucket| now.saturating_duration_since(bucket.refilled_at) < idle_ttl);
            shard.last_sweep = now;
        }
    }
}

impl Default for TokenBucketLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
