use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::{ApiResponse, Deleted};
use super::error::ApiError;
use super::extract::{PathId, ValidatedJson, ValidatedQuery};
use super::listing::{BOOK_PREFIX, GENRE_PREFIX, cached_page, invalidate, list_params};
use crate::infrastructure::AppState;
use crate::models::genre;
use crate::services::genre_service::{self, GenreChanges, NewGenre};

/// Genres are always ordered by name
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenreQuery {
    pub page: Option<u64>,
    /// asc or desc
    pub order: Option<String>,
    /// Case-insensitive match on the genre name
    #[serde(rename = "filterBy")]
    pub filter_by: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/genre",
    tag = "genre",
    params(GenreQuery),
    responses((status = 200, description = "Page of genres"))
)]
pub async fn list_genres(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<GenreQuery>,
) -> Result<ApiResponse<Vec<genre::Model>>, ApiError> {
    let params =
        list_params(query.page, None, query.order.as_deref())?.with("name", query.filter_by);

    let page = cached_page(
        &state,
        GENRE_PREFIX,
        &params,
        genre_service::list_genres(state.db(), &params, state.settings.page_size),
    )
    .await?;

    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/genre",
    tag = "genre",
    request_body = NewGenre,
    responses(
        (status = 201, description = "Genre created"),
        (status = 400, description = "Genre already exists")
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewGenre>,
) -> Result<ApiResponse<genre::Model>, ApiError> {
    let genre = genre_service::create_genre(state.db(), input).await?;
    invalidate(&state, &[GENRE_PREFIX]).await;
    Ok(ApiResponse::created(genre))
}

#[utoipa::path(
    patch,
    path = "/api/genre/{id}",
    tag = "genre",
    params(("id" = i32, Path, description = "Genre id")),
    request_body = GenreChanges,
    responses(
        (status = 200, description = "Genre updated"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    PathId(id): PathId,
    ValidatedJson(changes): ValidatedJson<GenreChanges>,
) -> Result<ApiResponse<genre::Model>, ApiError> {
    let genre = genre_service::update_genre(state.db(), id, changes).await?;
    invalidate(&state, &[GENRE_PREFIX, BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(genre))
}

#[utoipa::path(
    delete,
    path = "/api/genre/{id}",
    tag = "genre",
    params(("id" = i32, Path, description = "Genre id")),
    responses(
        (status = 200, description = "Genre deleted"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<ApiResponse<Deleted>, ApiError> {
    genre_service::delete_genre(state.db(), id).await?;
    invalidate(&state, &[GENRE_PREFIX, BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(Deleted { id }))
}
