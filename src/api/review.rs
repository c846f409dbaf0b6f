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
use crate::models::review;
use crate::services::review_service::{self, NewReview};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub page: Option<u64>,
    /// One of id, rating, created_at
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(rename = "book_id")]
    pub book_id: Option<String>,
    #[serde(rename = "customer_id")]
    pub customer_id: Option<String>,
    /// Minimum rating, inclusive
    pub rate_min: Option<String>,
    /// Maximum rating, inclusive
    pub rate_max: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/review",
    tag = "review",
    params(ReviewQuery),
    responses((status = 200, description = "Page of reviews"))
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ReviewQuery>,
) -> Result<ApiResponse<Vec<review::Model>>, ApiError> {
    let params = list_params(query.page, query.sort, query.order.as_deref())?
        .with("book_id", query.book_id)
        .with("customer_id", query.customer_id)
        .with("rateMin", query.rate_min)
        .with("rateMax", query.rate_max);

    let page = review_service::list_reviews(state.db(), &params, state.settings.page_size).await?;
    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/review",
    tag = "review",
    request_body = NewReview,
    responses(
        (status = 201, description = "Review created"),
        (status = 400, description = "Review already exists"),
        (status = 401, description = "No session"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_review(
    State(state): State<AppState>,
    session: SessionCustomer,
    ValidatedJson(input): ValidatedJson<NewReview>,
) -> Result<ApiResponse<review::Model>, ApiError> {
    let review = review_service::create_review(state.db(), session.id, input).await?;
    Ok(ApiResponse::created(review))
}

#[utoipa::path(
    delete,
    path = "/api/review/{id}",
    tag = "review",
    params(("id" = i32, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 401, description = "No session"),
        (status = 404, description = "No such review by this customer")
    )
)]
pub async fn delete_review(
    State(state): State<AppState>,
    session: SessionCustomer,
    PathId(id): PathId,
) -> Result<ApiResponse<Deleted>, ApiError> {
    review_service::delete_review(state.db(), id, session.id).await?;
    Ok(ApiResponse::ok(Deleted { id }))
}
