use axum::extract::State;
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::{ApiResponse, Deleted};
use super::error::ApiError;
use super::extract::{PathId, ValidatedJson, ValidatedQuery};
use super::listing::{BOOK_PREFIX, cached_page, invalidate, list_params};
use crate::infrastructure::AppState;
use crate::models::BookDto;
use crate::services::book_service::{self, BookChanges, NewBook};

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub page: Option<u64>,
    /// One of id, title, price, stock, publication_date
    pub sort: Option<String>,
    /// asc or desc
    pub order: Option<String>,
    /// One of title, isbn, author_id, genre_id, publisher_id
    #[serde(rename = "filterBy")]
    pub filter_by: Option<String>,
    /// Value matched against `filterBy`
    pub filterval: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/book",
    tag = "book",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = [BookDto]),
        (status = 422, description = "Invalid query")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<BookQuery>,
) -> Result<ApiResponse<Vec<BookDto>>, ApiError> {
    let mut params = list_params(query.page, query.sort, query.order.as_deref())?;

    if let Some(field) = query.filter_by.as_deref().filter(|f| !f.trim().is_empty()) {
        if !book_service::filter_spec().has_field(field) {
            return Err(ApiError::unprocessable(
                "filterBy must be one of: title, isbn, author_id, genre_id, publisher_id",
            ));
        }
        params = params.with(field, query.filterval);
    }

    let page = cached_page(
        &state,
        BOOK_PREFIX,
        &params,
        book_service::list_books(state.db(), &params, state.settings.page_size),
    )
    .await?;

    Ok(ApiResponse::page(page))
}

#[utoipa::path(
    post,
    path = "/api/book",
    tag = "book",
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = BookDto),
        (status = 404, description = "Author, genre or publisher not found"),
        (status = 422, description = "Invalid body")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewBook>,
) -> Result<ApiResponse<BookDto>, ApiError> {
    let book = book_service::create_book(state.db(), input).await?;
    invalidate(&state, &[BOOK_PREFIX]).await;
    Ok(ApiResponse::created(book))
}

#[utoipa::path(
    patch,
    path = "/api/book/{id}",
    tag = "book",
    params(("id" = i32, Path, description = "Book id")),
    request_body = BookChanges,
    responses(
        (status = 200, description = "Book updated", body = BookDto),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    PathId(id): PathId,
    ValidatedJson(changes): ValidatedJson<BookChanges>,
) -> Result<ApiResponse<BookDto>, ApiError> {
    let book = book_service::update_book(state.db(), id, changes).await?;
    invalidate(&state, &[BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(book))
}

#[utoipa::path(
    delete,
    path = "/api/book/{id}",
    tag = "book",
    params(("id" = i32, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> Result<ApiResponse<Deleted>, ApiError> {
    book_service::delete_book(state.db(), id).await?;
    invalidate(&state, &[BOOK_PREFIX]).await;
    Ok(ApiResponse::ok(Deleted { id }))
}
