use std::env;
use std::time::Duration;

/// Secrets used outside production when the variables are not set.
const DEV_ACCESS_SECRET: &str = "dev-access-secret";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret";
const DEV_COOKIE_SECRET: &str = "dev-cookie-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set when APP_ENV=production")]
    MissingSecret(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub redis_url: Option<String>,
    pub production: bool,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub cookie_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub rate_limit_points: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_block: Duration,
    pub page_size: u64,
    pub cache_ttl: Duration,
    pub images_dir: String,
    /// Take the client IP from `X-Forwarded-For`; only safe behind a proxy
    /// that overwrites the header
    pub trust_proxy: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://bookstore.db?mode=rwc".to_string()),
            port: parse_var("PORT", 8000)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            production,
            access_token_secret: secret("ACCESS_TOKEN_SECRET", DEV_ACCESS_SECRET, production)?,
            refresh_token_secret: secret("REFRESH_TOKEN_SECRET", DEV_REFRESH_SECRET, production)?,
            cookie_secret: secret("COOKIE_SECRET", DEV_COOKIE_SECRET, production)?,
            access_token_ttl: Duration::from_secs(parse_var("ACCESS_TOKEN_TTL_SECS", 900)?),
            refresh_token_ttl: Duration::from_secs(parse_var("REFRESH_TOKEN_TTL_SECS", 604_800)?),
            rate_limit_points: parse_var("RATE_LIMIT_POINTS", 5)?,
            rate_limit_window: Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECS", 60)?),
            rate_limit_block: Duration::from_secs(parse_var("RATE_LIMIT_BLOCK_SECS", 300)?),
            page_size: parse_var("PAGE_SIZE", 20)?,
            cache_ttl: Duration::from_secs(parse_var("CACHE_TTL_SECS", 300)?),
            images_dir: env::var("IMAGES_DIR").unwrap_or_else(|_| "static/images".to_string()),
            trust_proxy: parse_var("TRUST_PROXY", false)?,
        })
    }

    /// Configuration for tests and local tooling: in-memory SQLite, no Redis,
    /// development secrets.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
            redis_url: None,
            production: false,
            access_token_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_token_secret: DEV_REFRESH_SECRET.to_string(),
            cookie_secret: DEV_COOKIE_SECRET.to_string(),
            access_token_ttl: Duration::from_secs(900),
            refresh_token_ttl: Duration::from_secs(604_800),
            rate_limit_points: 5,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_block: Duration::from_secs(300),
            page_size: 20,
            cache_ttl: Duration::from_secs(300),
            images_dir: "static/images".to_string(),
            trust_proxy: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

fn secret(name: &'static str, dev_default: &str, production: bool) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ if production => Err(ConfigError::MissingSecret(name)),
        _ => Ok(dev_default.to_string()),
    }
}
