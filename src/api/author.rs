use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::{ApiResponse, Deleted};
use super::error::ApiError;
use super::extract::{PathId, ValidatedJson, ValidatedQuery};
use super::listing::{AUTHOR_PREFIX, BOOK_PREFIX, cached_page, invalidate, list_params};
use crate::infrastructure::AppState;
use crate::models::author;
use crate::services::author_service::{self, AuthorChanges, NewAuthor};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorQuery {
    /// Zero-based page, clamped to the last page
    pub page: Option<u64>,
    /// One of id, name, nationality
    pub sort: Option<String>,
    /// asc or desc
    pub order: Option<String>,
    /// Case-insensitive match on the author name
    pub filterval: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/author",
    tag = "author",
    params(AuthorQuery),
    responses(
        (status = 200, description = "Page of authors"),
        (status = 422, description = "Invalid query")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<AuthorQuery>,
) -> Result<ApiResponse<Vec<author::Model>>, ApiError> {
    let params = list_params(query.page, query.sort, query.order.as_deref())?
        .with("name", query.filterval);

    let page = cached_page(
        &state,
        AUTHOR_PREFIX,
        &params,
        author_service::list_authors(state.db(), &params, state.settings.page_size),
    )
    .await?;

    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/author",
    tag = "author",
    request_body = NewAuthor,
    responses(
        (status = 201, description = "Author created"),
        (status = 422, description = "Invalid body")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewAuthor>,
) -> Result<ApiResponse<author::Model>, ApiError> {
    let author = author_service::create_author(state.db(), input).await?;
    invalidate(&state, &[AUTHOR_PREFIX]).await;
    Ok(ApiResponse::created(author))
}

#[utoipa::path(
    patch,
    path = "/api/author/{id}",
    tag = "author",
    params(("id" = i32, Path, description = "Author id")),
    request_body = AuthorChanges,
    responses(
        (status = 200, description = "Author updated"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    PathId(id): PathId,
    ValidatedJson(changes): ValidatedJson<AuthorChanges>,
) -> Result<ApiResponse<author::Model>, ApiError> {
    let author = author_service::update_author(state.db(), id, changes).await?;
    invalidate(&state, &[AUTHOR_PREFIX, BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(author))
}

#[utoipa::path(
    delete,
    path = "/api/author/{id}",
    tag = "author",
    params(("id" = i32, Path, description = "Author id")),
    responses(
        (status = 200, description = "Author and their books deleted"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<ApiResponse<Deleted>, ApiError> {
    author_service::delete_author(state.db(), id).await?;
    invalidate(&state, &[AUTHOR_PREFIX, BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(Deleted { id }))
}
