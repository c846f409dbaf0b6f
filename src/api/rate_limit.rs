//! Login/registration throttling keyed by client IP and submitted email.

use std::net::SocketAddr;

use axum::{
    body::{Body, to_bytes},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use crate::infrastructure::AppState;
use crate::infrastructure::rate_limit::RateDecision;

pub const TOO_MANY_REQUESTS: &str = "Too many requests, please try again later";

const MAX_BODY_BYTES: usize = 64 * 1024;

/// The socket peer, else `unknown`. With `trust_proxy` the first
/// `X-Forwarded-For` entry wins over the peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Lowercased `email` field of a JSON body, empty when absent
pub fn body_email(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("email")
                .and_then(|email| email.as_str())
                .map(|email| email.trim().to_lowercase())
        })
        .unwrap_or_default()
}

pub async fn limit_by_ip_email(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(request.headers(), peer, state.settings.trust_proxy);

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return ApiError::bad_request("Request body too large").into_response(),
    };
    let key = format!("{}_{}", ip, body_email(&bytes));

    match state.limiter.check(&key).await {
        Ok(RateDecision::Allowed { .. }) => {}
        Ok(RateDecision::Blocked { retry_after }) => {
            tracing::warn!(key = %key, "Rate limit exceeded");
            let mut response = ApiError::too_many_requests(TOO_MANY_REQUESTS).into_response();
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
            return response;
        }
        Err(e) => {
            tracing::warn!(
                "Rate limiter ({}) unavailable, letting request through: {}",
                state.limiter.provider_name(),
                e
            );
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
