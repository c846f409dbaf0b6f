//! Shared plumbing for list endpoints: query parsing and the response cache.

use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use super::error::ApiError;
use crate::domain::{DomainError, ListParams, Page, SortOrder};
use crate::infrastructure::AppState;

pub const BOOK_PREFIX: &str = "book:";
pub const AUTHOR_PREFIX: &str = "author:";
pub const GENRE_PREFIX: &str = "genre:";
pub const PUBLISHER_PREFIX: &str = "publisher:";

/// Common page/sort/order triple; criteria are added by each endpoint.
pub fn list_params(
    page: Option<u64>,
    sort: Option<String>,
    order: Option<&str>,
) -> Result<ListParams, ApiError> {
    let order = SortOrder::parse(order)?;
    Ok(ListParams::new(page, sort, order))
}

/// Serve a list from the cache, or load it and fill the cache.
///
/// Cache failures are logged and treated as misses.
pub async fn cached_page<T, F>(
    state: &AppState,
    prefix: &str,
    params: &ListParams,
    load: F,
) -> Result<Page<T>, ApiError>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<Page<T>, DomainError>>,
{
    let key = format!("{}{}", prefix, params.cache_key());

    match state.cache.get(&key).await {
        Ok(Some(raw)) => match serde_json::from_str::<Page<T>>(&raw) {
            Ok(page) => {
                tracing::debug!(key = %key, "Cache hit");
                return Ok(page);
            }
            Err(e) => tracing::warn!(key = %key, "Discarding unreadable cache entry: {}", e),
        },
        Ok(None) => tracing::debug!(key = %key, "Cache miss"),
        Err(e) => tracing::warn!("Cache read failed ({}): {}", state.cache.provider_name(), e),
    }

    let page = load.await?;

    match serde_json::to_string(&page) {
        Ok(raw) => {
            if let Err(e) = state.cache.set(&key, &raw, state.settings.cache_ttl).await {
                tracing::warn!("Cache write failed ({}): {}", state.cache.provider_name(), e);
            }
        }
        Err(e) => tracing::warn!("Could not serialize page for cache: {}", e),
    }

    Ok(page)
}

/// Drop every cached list under the given prefixes
pub async fn invalidate(state: &AppState, prefixes: &[&str]) {
    for prefix in prefixes {
        if let Err(e) = state.cache.delete_prefix(prefix).await {
            tracing::warn!("Cache invalidation of {} failed: {}", prefix, e);
        }
    }
}
