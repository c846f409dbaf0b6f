//! Application state containing the store, cache and auth collaborators

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::auth::TokenService;
use crate::infrastructure::cache::{CacheStore, MemoryCache, RedisCache, connect_redis};
use crate::infrastructure::config::Config;
use crate::infrastructure::cookies::CookieSigner;
use crate::infrastructure::rate_limit::{RateLimitPolicy, RateLimiter, RedisRateLimitStore};

/// Settings handlers read on every request
#[derive(Debug, Clone)]
pub struct Settings {
    pub page_size: u64,
    pub cache_ttl: Duration,
    pub images_dir: String,
    pub trust_proxy: bool,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub cache: Arc<dyn CacheStore>,
    pub limiter: Arc<RateLimiter>,
    pub tokens: Arc<TokenService>,
    pub cookies: Arc<CookieSigner>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the state, connecting to Redis when `REDIS_URL` is configured.
    pub async fn connect(db: DatabaseConnection, config: &Config) -> Result<Self, String> {
        let policy = rate_limit_policy(config);

        let (cache, limiter): (Arc<dyn CacheStore>, RateLimiter) = match &config.redis_url {
            Some(url) => {
                let connection = connect_redis(url).await.map_err(|e| e.to_string())?;
                tracing::info!("Using Redis for cache and rate limiting");
                (
                    Arc::new(RedisCache::new(connection.clone())),
                    RateLimiter::new(Box::new(RedisRateLimitStore::new(connection)), policy),
                )
            }
            None => {
                tracing::info!("REDIS_URL not set, using in-memory cache and rate limiting");
                (Arc::new(MemoryCache::new()), RateLimiter::in_memory(policy))
            }
        };

        Ok(Self::with_backends(db, config, cache, limiter))
    }

    /// In-memory backends only, never touches the network.
    pub fn in_memory(db: DatabaseConnection, config: &Config) -> Self {
        Self::with_backends(
            db,
            config,
            Arc::new(MemoryCache::new()),
            RateLimiter::in_memory(rate_limit_policy(config)),
        )
    }

    pub fn with_backends(
        db: DatabaseConnection,
        config: &Config,
        cache: Arc<dyn CacheStore>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            db,
            cache,
            limiter: Arc::new(limiter),
            tokens: Arc::new(TokenService::new(
                config.access_token_secret.clone(),
                config.refresh_token_secret.clone(),
                config.access_token_ttl,
                config.refresh_token_ttl,
            )),
            cookies: Arc::new(CookieSigner::new(&config.cookie_secret, config.production)),
            settings: Arc::new(Settings {
                page_size: config.page_size,
                cache_ttl: config.cache_ttl,
                images_dir: config.images_dir.clone(),
                trust_proxy: config.trust_proxy,
            }),
        }
    }

    /// Get the database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn rate_limit_policy(config: &Config) -> RateLimitPolicy {
    RateLimitPolicy {
        points: config.rate_limit_points,
        window: config.rate_limit_window,
        block: config.rate_limit_block,
    }
}
