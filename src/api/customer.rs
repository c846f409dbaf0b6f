use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::{ApiResponse, Deleted};
use super::error::ApiError;
use super::extract::{PathId, ValidatedJson, ValidatedQuery};
use super::listing::list_params;
use super::session::SessionCustomer;
use crate::infrastructure::AppState;
use crate::infrastructure::cookies::{ACCESS_COOKIE, REFRESH_COOKIE, append_set_cookies};
use crate::models::CustomerDto;
use crate::services::customer_service::{self, Credentials, CustomerChanges, NewCustomer};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerQuery {
    pub page: Option<u64>,
    /// One of id, first_name, last_name, email, created_at
    pub sort: Option<String>,
    pub order: Option<String>,
    /// One of first_name, last_name, email, phone
    pub filterkey: Option<String>,
    /// Value matched against `filterkey`
    pub filterval: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/customer",
    tag = "customer",
    params(CustomerQuery),
    responses((status = 200, description = "Page of customers", body = [CustomerDto]))
)]
pub async fn list_customers(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<CustomerQuery>,
) -> Result<ApiResponse<Vec<CustomerDto>>, ApiError> {
    let mut params = list_params(query.page, query.sort, query.order.as_deref())?;

    if let Some(key) = query.filterkey.as_deref().filter(|k| !k.trim().is_empty()) {
        if !customer_service::filter_spec().has_field(key) {
            return Err(ApiError::unprocessable(
                "filterkey must be one of: first_name, last_name, email, phone",
            ));
        }
        params = params.with(key, query.filterval);
    }

    let page =
        customer_service::list_customers(state.db(), &params, state.settings.page_size).await?;
    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/customer",
    tag = "customer",
    request_body = NewCustomer,
    responses(
        (status = 201, description = "Customer created", body = CustomerDto),
        (status = 400, description = "Customer already registered"),
        (status = 422, description = "Invalid body")
    )
)]
pub async fn create_customer(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewCustomer>,
) -> Result<ApiResponse<CustomerDto>, ApiError> {
    let customer = customer_service::register_customer(state.db(), input).await?;
    Ok(ApiResponse::created(customer))
}

#[utoipa::path(
    post,
    path = "/api/customer/register",
    tag = "customer",
    request_body = NewCustomer,
    responses(
        (status = 201, description = "Customer registered", body = CustomerDto),
        (status = 400, description = "Customer already registered"),
        (status = 422, description = "Invalid body"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewCustomer>,
) -> Result<ApiResponse<CustomerDto>, ApiError> {
    let customer = customer_service::register_customer(state.db(), input).await?;
    Ok(ApiResponse::created(customer))
}

#[utoipa::path(
    post,
    path = "/api/customer/login",
    tag = "customer",
    request_body = Credentials,
    responses(
        (status = 200, description = "Logged in, session cookies set", body = CustomerDto),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<Response, ApiError> {
    let customer = customer_service::authenticate(state.db(), credentials).await?;

    let access = state
        .tokens
        .create_access_token(customer.id, &customer.full_name())
        .map_err(ApiError::internal)?;
    let refresh = state
        .tokens
        .create_refresh_token(customer.id)
        .map_err(ApiError::internal)?;
    tracing::info!("Customer {} logged in", customer.id);

    let mut response = ApiResponse::ok(CustomerDto::from(customer)).into_response();
    append_set_cookies(
        response.headers_mut(),
        [
            state
                .cookies
                .set_cookie(ACCESS_COOKIE, &access, state.tokens.access_ttl()),
            state
                .cookies
                .set_cookie(REFRESH_COOKIE, &refresh, state.tokens.refresh_ttl()),
        ],
    );
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/customer/logout",
    tag = "customer",
    responses((status = 200, description = "Session cookies cleared"))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = ApiResponse::ok("Logged out").into_response();
    append_set_cookies(
        response.headers_mut(),
        [
            state.cookies.clear_cookie(ACCESS_COOKIE),
            state.cookies.clear_cookie(REFRESH_COOKIE),
        ],
    );
    response
}

fn ensure_self(session: &SessionCustomer, id: i32) -> Result<(), ApiError> {
    if session.id != id {
        tracing::warn!("Customer {} tried to modify customer {}", session.id, id);
        return Err(ApiError::unauthorized("Not allowed to modify another customer"));
    }
    Ok(())
}

#[utoipa::path(
    patch,
    path = "/api/customer/{id}",
    tag = "customer",
    params(("id" = i32, Path, description = "Customer id")),
    request_body = CustomerChanges,
    responses(
        (status = 200, description = "Customer updated", body = CustomerDto),
        (status = 401, description = "No session, or not the session customer")
    )
)]
pub async fn update_customer(
    State(state): State<AppState>,
    session: SessionCustomer,
    PathId(id): PathId,
    ValidatedJson(changes): ValidatedJson<CustomerChanges>,
) -> Result<ApiResponse<CustomerDto>, ApiError> {
    ensure_self(&session, id)?;
    let customer = customer_service::update_customer(state.db(), id, changes).await?;
    Ok(ApiResponse::ok(customer))
}

#[utoipa::path(
    delete,
    path = "/api/customer/{id}",
    tag = "customer",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deleted"),
        (status = 401, description = "No session, or not the session customer")
    )
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    session: SessionCustomer,
    PathId(id): PathId,
) -> Result<Response, ApiError> {
    ensure_self(&session, id)?;
    customer_service::delete_customer(state.db(), id).await?;

    let mut response = ApiResponse::ok(Deleted { id }).into_response();
    append_set_cookies(
        response.headers_mut(),
        [
            state.cookies.clear_cookie(ACCESS_COOKIE),
            state.cookies.clear_cookie(REFRESH_COOKIE),
        ],
    );
    Ok(response)
}
