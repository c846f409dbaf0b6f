//! Fixed-window request limiter with a block period.
//!
//! Each key may be hit `points` times per `window`. The hit that goes over
//! the budget blocks the key for `block`, and the counter starts from zero
//! once the block expires.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::time::Instant;

use super::cache::{SWEEP_THRESHOLD, SweepSchedule};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub points: u32,
    pub window: Duration,
    pub block: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Blocked { retry_after: Duration },
}

#[derive(Debug, thiserror::Error)]
#[error("rate limit backend error: {0}")]
pub struct RateLimitError(String);

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one hit against `key` and decide whether it may proceed
    async fn hit(&self, key: &str, policy: &RateLimitPolicy)
    -> Result<RateDecision, RateLimitError>;

    fn provider_name(&self) -> &'static str;
}

/// Store plus the policy it enforces.
pub struct RateLimiter {
    store: Box<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Box<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self::new(Box::new(MemoryRateLimitStore::new()), policy)
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub async fn check(&self, key: &str) -> Result<RateDecision, RateLimitError> {
        self.store.hit(key, &self.policy).await
    }

    pub fn provider_name(&self) -> &'static str {
        self.store.provider_name()
    }
}

struct Bucket {
    hits: u32,
    window_ends: Instant,
    blocked_until: Option<Instant>,
}

impl Bucket {
    /// A bucket whose window and block have both ended behaves like a new one
    fn is_live(&self, now: Instant) -> bool {
        self.window_ends > now || self.blocked_until.is_some_and(|until| until > now)
    }
}

pub struct MemoryRateLimitStore {
    buckets: DashMap<String, Bucket>,
    sweep: SweepSchedule,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(threshold: usize) -> Self {
        Self {
            buckets: DashMap::new(),
            sweep: SweepSchedule::new(threshold),
        }
    }
}

impl Default for MemoryRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateDecision, RateLimitError> {
        let now = Instant::now();
        // Must run before `entry` takes a shard lock
        if self.sweep.due(self.buckets.len(), now) {
            let before = self.buckets.len();
            self.buckets.retain(|_, bucket| bucket.is_live(now));
            tracing::debug!(
                removed = before - self.buckets.len(),
                "Swept idle rate limit buckets"
            );
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            hits: 0,
            window_ends: now + policy.window,
            blocked_until: None,
        });

        if let Some(until) = bucket.blocked_until {
            if until > now {
                return Ok(RateDecision::Blocked {
                    retry_after: until - now,
                });
            }
            bucket.blocked_until = None;
            bucket.hits = 0;
            bucket.window_ends = now + policy.window;
        }

        if bucket.window_ends <= now {
            bucket.hits = 0;
            bucket.window_ends = now + policy.window;
        }

        bucket.hits += 1;
        if bucket.hits > policy.points {
            bucket.blocked_until = Some(now + policy.block);
            bucket.hits = 0;
            return Ok(RateDecision::Blocked {
                retry_after: policy.block,
            });
        }

        Ok(RateDecision::Allowed {
            remaining: policy.points - bucket.hits,
        })
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Redis store: `INCR` on `rl:hits:<key>` with a window expiry, and a
/// `rl:block:<key>` marker set with `PX` when the budget is exceeded.
pub struct RedisRateLimitStore {
    connection: ConnectionManager,
}

impl RedisRateLimitStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateDecision, RateLimitError> {
        let mut conn = self.connection.clone();
        let block_key = format!("rl:block:{}", key);
        let hits_key = format!("rl:hits:{}", key);
        let backend = |e: redis::RedisError| RateLimitError(e.to_string());

        let blocked_ms: i64 = redis::cmd("PTTL")
            .arg(&block_key)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        if blocked_ms > 0 {
            return Ok(RateDecision::Blocked {
                retry_after: Duration::from_millis(blocked_ms as u64),
            });
        }

        // The counter is created with its window expiry in the same transaction
        // that increments it, so it never outlives the window.
        let (hits,): (u32,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&hits_key)
            .arg(0)
            .arg("PX")
            .arg(policy.window.as_millis() as u64)
            .arg("NX")
            .ignore()
            .cmd("INCR")
            .arg(&hits_key)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        if hits > policy.points {
            redis::cmd("SET")
                .arg(&block_key)
                .arg(1)
                .arg("PX")
                .arg(policy.block.as_millis() as u64)
                .query_async::<()>(&mut conn)
                .await
                .map_err(backend)?;
            redis::cmd("DEL")
                .arg(&hits_key)
                .query_async::<()>(&mut conn)
                .await
                .map_err(backend)?;
            return Ok(RateDecision::Blocked {
                retry_after: policy.block,
            });
        }

        Ok(RateDecision::Allowed {
            remaining: policy.points - hits,
        })
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy {
            points: 3,
            window: Duration::from_secs(60),
            block: Duration::from_secs(300),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_after_budget_and_recovers_after_block() {
        let limiter = RateLimiter::in_memory(policy());
        for remaining in [2, 1, 0] {
            assert_eq!(
                limiter.check("127.0.0.1_a@b.c").await.unwrap(),
                RateDecision::Allowed { remaining }
            );
        }
        assert!(matches!(
            limiter.check("127.0.0.1_a@b.c").await.unwrap(),
            RateDecision::Blocked { .. }
        ));

        // Still blocked just before the block ends
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(matches!(
            limiter.check("127.0.0.1_a@b.c").await.unwrap(),
            RateDecision::Blocked { .. }
        ));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            limiter.check("127.0.0.1_a@b.c").await.unwrap(),
            RateDecision::Allowed { remaining: 2 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::in_memory(policy());
        for _ in 0..3 {
            limiter.check("k").await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(
            limiter.check("k").await.unwrap(),
            RateDecision::Allowed { remaining: 2 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_buckets_are_evicted() {
        let store = MemoryRateLimitStore::with_sweep_threshold(3);
        for i in 0..3 {
            store.hit(&format!("10.0.0.{}_a@b.c", i), &policy()).await.unwrap();
        }
        // Over budget, so this key stays blocked past the window
        for _ in 0..4 {
            store.hit("10.0.0.0_a@b.c", &policy()).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(61)).await;

        store.hit("10.0.0.9_a@b.c", &policy()).await.unwrap();
        assert_eq!(store.buckets.len(), 2);
        assert!(store.buckets.contains_key("10.0.0.0_a@b.c"));
    }

    #[tokio::test]
    #[ignore] // Requires a Redis server at REDIS_URL
    async fn redis_hit_counter_always_expires() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());
        let connection = crate::infrastructure::cache::connect_redis(&url).await.unwrap();
        let store = RedisRateLimitStore::new(connection.clone());
        let key = format!("ttl-check-{}", std::process::id());

        for remaining in [2, 1] {
            assert_eq!(
                store.hit(&key, &policy()).await.unwrap(),
                RateDecision::Allowed { remaining }
            );
        }

        let mut conn = connection;
        let ttl_ms: i64 = redis::cmd("PTTL")
            .arg(format!("rl:hits:{}", key))
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(ttl_ms > 0 && ttl_ms <= 60_000, "ttl {}", ttl_ms);

        redis::cmd("DEL")
            .arg(format!("rl:hits:{}", key))
            .query_async::<()>(&mut conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::in_memory(policy());
        for _ in 0..4 {
            limiter.check("1.1.1.1_x@y.z").await.unwrap();
        }
        assert!(matches!(
            limiter.check("1.1.1.1_other@y.z").await.unwrap(),
            RateDecision::Allowed { .. }
        ));
    }
}
