//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Password hashing and JWTs (auth), signed cookies (cookies)
//! - List cache and rate limiter backends (cache, rate_limit)
//! - Filter/sort query building (query)
//! - Application state (state)

pub mod auth;
pub mod cache;
pub mod config;
pub mod cookies;
pub mod db;
pub mod query;
pub mod rate_limit;
pub mod seed;
pub mod server;
pub mod state;

pub use state::AppState;
