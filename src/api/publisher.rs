use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::{ApiResponse, Deleted};
use super::error::ApiError;
use super::extract::{PathId, ValidatedJson, ValidatedQuery};
use super::listing::{BOOK_PREFIX, PUBLISHER_PREFIX, cached_page, invalidate, list_params};
use crate::infrastructure::AppState;
use crate::models::publisher;
use crate::services::publisher_service::{self, NewPublisher, PublisherChanges};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublisherQuery {
    pub page: Option<u64>,
    pub order: Option<String>,
    /// Case-insensitive match on the publisher name
    pub filter: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/publisher",
    tag = "publisher",
    params(PublisherQuery),
    responses((status = 200, description = "Page of publishers"))
)]
pub async fn list_publishers(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<PublisherQuery>,
) -> Result<ApiResponse<Vec<publisher::Model>>, ApiError> {
    let params = list_params(query.page, None, query.order.as_deref())?.with("name", query.filter);

    let page = cached_page(
        &state,
        PUBLISHER_PREFIX,
        &params,
        publisher_service::list_publishers(state.db(), &params, state.settings.page_size),
    )
    .await?;

    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/publisher",
    tag = "publisher",
    request_body = NewPublisher,
    responses((status = 201, description = "Publisher created"))
)]
pub async fn create_publisher(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewPublisher>,
) -> Result<ApiResponse<publisher::Model>, ApiError> {
    let publisher = publisher_service::create_publisher(state.db(), input).await?;
    invalidate(&state, &[PUBLISHER_PREFIX]).await;
    Ok(ApiResponse::created(publisher))
}

#[utoipa::path(
    patch,
    path = "/api/publisher/{id}",
    tag = "publisher",
    params(("id" = i32, Path, description = "Publisher id")),
    request_body = PublisherChanges,
    responses(
        (status = 200, description = "Publisher updated"),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn update_publisher(
    State(state): State<AppState>,
    PathId(id): PathId,
    ValidatedJson(changes): ValidatedJson<PublisherChanges>,
) -> Result<ApiResponse<publisher::Model>, ApiError> {
    let publisher = publisher_service::update_publisher(state.db(), id, changes).await?;
    invalidate(&state, &[PUBLISHER_PREFIX, BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(publisher))
}

#[utoipa::path(
    delete,
    path = "/api/publisher/{id}",
    tag = "publisher",
    params(("id" = i32, Path, description = "Publisher id")),
    responses(
        (status = 200, description = "Publisher deleted"),
        (status = 404, description = "Publisher not found")
    )
)]
pub async fn delete_publisher(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<ApiResponse<Deleted>, ApiError> {
    publisher_service::delete_publisher(state.db(), id).await?;
    invalidate(&state, &[PUBLISHER_PREFIX, BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(Deleted { id }))
}
