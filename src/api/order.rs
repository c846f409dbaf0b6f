use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::{ApiResponse, Deleted};
use super::error::ApiError;
use super::extract::{PathId, ValidatedJson, ValidatedQuery};
use super::listing::list_params;
use super::session::SessionCustomer;
use crate::infrastructure::AppState;
use crate::models::OrderDto;
use crate::services::order_service::{self, NewOrder};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderQuery {
    pub page: Option<u64>,
    /// One of id, order_date, total_amount
    pub sort: Option<String>,
    pub order: Option<String>,
    /// Customer id
    pub customer: Option<String>,
    /// Start date (YYYY-MM-DD), only applied together with `dateend`
    #[validate(custom(function = "crate::services::validate_date"))]
    pub dateinit: Option<String>,
    /// End date (YYYY-MM-DD), inclusive
    #[validate(custom(function = "crate::services::validate_date"))]
    pub dateend: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/order",
    tag = "order",
    params(OrderQuery),
    responses((status = 200, description = "Page of orders with their lines", body = [OrderDto]))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<OrderQuery>,
) -> Result<ApiResponse<Vec<OrderDto>>, ApiError> {
    let params = list_params(query.page, query.sort, query.order.as_deref())?
        .with("customer", query.customer)
        .with("dateinit", query.dateinit)
        .with("dateend", query.dateend);

    let page = order_service::list_orders(state.db(), &params, state.settings.page_size).await?;
    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/order",
    tag = "order",
    request_body = NewOrder,
    responses(
        (status = 201, description = "Order placed", body = OrderDto),
        (status = 401, description = "No session"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    session: SessionCustomer,
    ValidatedJson(input): ValidatedJson<NewOrder>,
) -> Result<ApiResponse<OrderDto>, ApiError> {
    let order = order_service::create_order(state.db(), session.id, input).await?;
    Ok(ApiResponse::created(order))
}

#[utoipa::path(
    delete,
    path = "/api/order/{id}",
    tag = "order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 401, description = "No session"),
        (status = 404, description = "No such order for this customer")
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    session: SessionCustomer,
    PathId(id): PathId,
) -> Result<ApiResponse<Deleted>, ApiError> {
    order_service::delete_order(state.db(), id, session.id).await?;
    Ok(ApiResponse::ok(Deleted { id }))
}
