//! Customer session middleware.
//!
//! The refresh cookie decides whether a request is authenticated at all. A
//! valid refresh token with a missing or stale access token mints a new
//! access token; anything else ends the request with 401 and clears both
//! cookies.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::cookies::{ACCESS_COOKIE, REFRESH_COOKIE, append_set_cookies};
use crate::services::customer_service;

/// The customer behind the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCustomer {
    pub id: i32,
    pub name: String,
}

fn reject(state: &AppState, reason: &str) -> Response {
    tracing::warn!("Session rejected: {}", reason);
    let mut response = ApiError::unauthorized("Unauthorized").into_response();
    append_set_cookies(
        response.headers_mut(),
        [
            state.cookies.clear_cookie(ACCESS_COOKIE),
            state.cookies.clear_cookie(REFRESH_COOKIE),
        ],
    );
    response
}

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();

    let Some(refresh) = state.cookies.read(headers, REFRESH_COOKIE) else {
        return reject(&state, "no refresh cookie");
    };
    let Some(customer_id) = state
        .tokens
        .decode_refresh_token(refresh)
        .ok()
        .and_then(|claims| claims.customer_id())
    else {
        return reject(&state, "invalid refresh token");
    };

    let access = state
        .cookies
        .read(headers, ACCESS_COOKIE)
        .and_then(|token| state.tokens.decode_access_token(token).ok())
        .filter(|claims| claims.customer_id() == Some(customer_id));

    if let Some(claims) = access {
        request.extensions_mut().insert(SessionCustomer {
            id: customer_id,
            name: claims.name,
        });
        return next.run(request).await;
    }

    // Refresh path: the customer must still exist
    let customer = match customer_service::get_customer(state.db(), customer_id).await {
        Ok(customer) => customer,
        Err(DomainError::NotFound(_)) => return reject(&state, "customer no longer exists"),
        Err(e) => return ApiError::from(e).into_response(),
    };
    let name = customer.full_name();
    let token = match state.tokens.create_access_token(customer_id, &name) {
        Ok(token) => token,
        Err(e) => return ApiError::internal(e).into_response(),
    };
    tracing::debug!("Refreshed access token for customer {}", customer_id);

    request.extensions_mut().insert(SessionCustomer {
        id: customer_id,
        name,
    });
    let mut response = next.run(request).await;
    append_set_cookies(
        response.headers_mut(),
        [state
            .cookies
            .set_cookie(ACCESS_COOKIE, &token, state.tokens.access_ttl())],
    );
    response
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionCustomer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionCustomer>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}
