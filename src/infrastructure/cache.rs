//! List-response cache.
//!
//! Keys look like `book:page=0&sort=&order=asc`. Writes drop every key under
//! the entity prefix; there is no finer-grained invalidation.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// In-memory maps sweep expired entries once they hold this many keys
pub(crate) const SWEEP_THRESHOLD: usize = 10_000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Decides when an in-memory map is swept: only past a size threshold, and at
/// most once per `SWEEP_INTERVAL`.
pub(crate) struct SweepSchedule {
    threshold: usize,
    next: Mutex<Instant>,
}

impl SweepSchedule {
    pub(crate) fn new(threshold: usize) -> Self {
        Self {
            threshold,
            next: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn due(&self, len: usize, now: Instant) -> bool {
        if len < self.threshold {
            return false;
        }
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next > now {
            return false;
        }
        *next = now + SWEEP_INTERVAL;
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),
    #[error("cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` on a miss
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64>;

    fn provider_name(&self) -> &'static str;
}

/// Open a multiplexed Redis connection shared by the cache and the limiter.
pub async fn connect_redis(url: &str) -> CacheResult<ConnectionManager> {
    let client = redis::Client::open(url)
        .map_err(|e| CacheError::Connection(format!("Failed to create Redis client: {}", e)))?;

    ConnectionManager::new(client)
        .await
        .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))
}

/// Redis-backed cache using `SETEX` and `SCAN` + `DEL` for prefix deletes.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis SETEX failed: {}", e)))
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}*", prefix);
        let mut deleted: u64 = 0;
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Backend(format!("Redis SCAN failed: {}", e)))?;

            if !keys.is_empty() {
                let count: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| CacheError::Backend(format!("Redis DEL failed: {}", e)))?;
                deleted += count;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(prefix = prefix, deleted = deleted, "Cache prefix DEL");
        Ok(deleted)
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}

/// In-process cache used when no Redis URL is configured.
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
    sweep: SweepSchedule,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(threshold: usize) -> Self {
        Self {
            entries: DashMap::new(),
            sweep: SweepSchedule::new(threshold),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone());
        if hit.is_none() {
            self.entries.remove_if(key, |_, (_, expires)| *expires <= now);
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        if self.sweep.due(self.entries.len(), now) {
            let before = self.entries.len();
            self.entries.retain(|_, (_, expires)| *expires > now);
            debug!(removed = before - self.entries.len(), "Swept expired cache entries");
        }
        self.entries
            .insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - self.entries.len()) as u64)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_get_set() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("book:page=0").await.unwrap(), None);
        cache
            .set("book:page=0", "[]", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("book:page=0").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn memory_cache_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("author:page=0", "[]", Duration::from_secs(10))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("author:page=0").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_swept_once_the_map_is_large() {
        let cache = MemoryCache::with_sweep_threshold(3);
        for key in ["author:filterval=a", "author:filterval=b", "author:filterval=c"] {
            cache.set(key, "[]", Duration::from_secs(10)).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        cache
            .set("author:filterval=d", "[]", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.entries.len(), 1);
    }

    #[tokio::test]
    async fn live_entries_survive_a_sweep() {
        let cache = MemoryCache::with_sweep_threshold(1);
        let ttl = Duration::from_secs(60);
        cache.set("book:page=0", "a", ttl).await.unwrap();
        cache.set("book:page=1", "b", ttl).await.unwrap();
        assert_eq!(cache.entries.len(), 2);
    }

    #[tokio::test]
    async fn memory_cache_prefix_delete_only_touches_prefix() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("book:page=0", "a", ttl).await.unwrap();
        cache.set("book:page=1", "b", ttl).await.unwrap();
        cache.set("genre:page=0", "c", ttl).await.unwrap();

        assert_eq!(cache.delete_prefix("book:").await.unwrap(), 2);
        assert_eq!(cache.get("book:page=0").await.unwrap(), None);
        assert_eq!(cache.get("genre:page=0").await.unwrap().as_deref(), Some("c"));
    }
}
