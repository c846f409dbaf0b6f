//! Book Service - Pure business logic without HTTP layer
//!
//! Books reference an author, a genre and a publisher. Each reference is
//! checked before the write so a missing parent is reported as a 404 rather
//! than a foreign key failure.
#![allow(clippy::needless_update)] // SeaORM ActiveModels require ..Default::default()

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{DomainError, ListParams, Page, search_key};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::book::{self, ActiveModel as BookActiveModel, Entity as BookEntity};
use crate::models::{BookDto, author, genre, publisher};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    #[validate(
        required(message = "title is required"),
        length(min = 1, max = 200, message = "title must be 1 to 200 characters")
    )]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 17, message = "isbn must be 10 to 17 characters"))]
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[validate(
        required(message = "price is required"),
        range(min = 0.0, message = "price must not be negative")
    )]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: Option<i32>,
    #[validate(custom(function = "super::validate_date"))]
    pub publication_date: Option<String>,
    #[validate(required(message = "author_id is required"))]
    pub author_id: Option<i32>,
    #[validate(required(message = "genre_id is required"))]
    pub genre_id: Option<i32>,
    #[validate(required(message = "publisher_id is required"))]
    pub publisher_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookChanges {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 17, message = "isbn must be 10 to 17 characters"))]
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "stock must not be negative"))]
    pub stock: Option<i32>,
    #[validate(custom(function = "super::validate_date"))]
    pub publication_date: Option<String>,
    pub author_id: Option<i32>,
    pub genre_id: Option<i32>,
    pub publisher_id: Option<i32>,
}

pub fn filter_spec() -> FilterSpec<BookEntity> {
    FilterSpec::new(book::Column::Id)
        .sortable("id", book::Column::Id)
        .sortable("title", book::Column::Title)
        .sortable("price", book::Column::Price)
        .sortable("stock", book::Column::Stock)
        .sortable("publication_date", book::Column::PublicationDate)
        .field("title", FieldRule::Contains(book::Column::TitleSearch))
        .field("isbn", FieldRule::Contains(book::Column::Isbn))
        .field("author_id", FieldRule::Equals(book::Column::AuthorId))
        .field("genre_id", FieldRule::Equals(book::Column::GenreId))
        .field("publisher_id", FieldRule::Equals(book::Column::PublisherId))
}

/// List books with the shared filter/sort rules
pub async fn list_books(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<BookDto>, DomainError> {
    tracing::debug!("List books - {}", params.cache_key());
    let select = filter_spec().apply(BookEntity::find(), params)?;
    Ok(fetch_page(db, select, page_size, params.page)
        .await?
        .map(BookDto::from))
}

pub async fn get_book(db: &DatabaseConnection, id: i32) -> Result<book::Model, DomainError> {
    BookEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Book"))
}

async fn ensure_references(
    db: &DatabaseConnection,
    author_id: Option<i32>,
    genre_id: Option<i32>,
    publisher_id: Option<i32>,
) -> Result<(), DomainError> {
    if let Some(id) = author_id
        && author::Entity::find_by_id(id).one(db).await?.is_none()
    {
        return Err(DomainError::not_found("Author"));
    }
    if let Some(id) = genre_id
        && genre::Entity::find_by_id(id).one(db).await?.is_none()
    {
        return Err(DomainError::not_found("Genre"));
    }
    if let Some(id) = publisher_id
        && publisher::Entity::find_by_id(id).one(db).await?.is_none()
    {
        return Err(DomainError::not_found("Publisher"));
    }
    Ok(())
}

pub async fn create_book(db: &DatabaseConnection, input: NewBook) -> Result<BookDto, DomainError> {
    let (Some(author_id), Some(genre_id), Some(publisher_id)) =
        (input.author_id, input.genre_id, input.publisher_id)
    else {
        return Err(DomainError::Validation(
            "author_id, genre_id and publisher_id are required".to_string(),
        ));
    };
    ensure_references(db, Some(author_id), Some(genre_id), Some(publisher_id)).await?;

    let now = chrono::Utc::now().to_rfc3339();
    let title = input.title.unwrap_or_default().trim().to_string();
    let book = BookActiveModel {
        title_search: Set(search_key(&title)),
        title: Set(title),
        isbn: Set(input.isbn.map(|isbn| isbn.trim().to_string())),
        description: Set(input.description),
        price: Set(input.price.unwrap_or_default()),
        stock: Set(input.stock.unwrap_or(0)),
        publication_date: Set(input.publication_date),
        author_id: Set(author_id),
        genre_id: Set(genre_id),
        publisher_id: Set(publisher_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = book.insert(db).await?;
    tracing::info!("Created book {} ({})", model.id, model.title);
    Ok(model.into())
}

pub async fn update_book(
    db: &DatabaseConnection,
    id: i32,
    changes: BookChanges,
) -> Result<BookDto, DomainError> {
    let existing = get_book(db, id).await?;
    ensure_references(db, changes.author_id, changes.genre_id, changes.publisher_id).await?;

    let mut active: BookActiveModel = existing.into();
    if let Some(title) = changes.title {
        let title = title.trim().to_string();
        active.title_search = Set(search_key(&title));
        active.title = Set(title);
    }
    if let Some(isbn) = changes.isbn {
        active.isbn = Set(Some(isbn.trim().to_string()));
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = changes.price {
        active.price = Set(price);
    }
    if let Some(stock) = changes.stock {
        active.stock = Set(stock);
    }
    if let Some(date) = changes.publication_date {
        active.publication_date = Set(Some(date));
    }
    if let Some(author_id) = changes.author_id {
        active.author_id = Set(author_id);
    }
    if let Some(genre_id) = changes.genre_id {
        active.genre_id = Set(genre_id);
    }
    if let Some(publisher_id) = changes.publisher_id {
        active.publisher_id = Set(publisher_id);
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?.into())
}

/// Delete a book; its reviews and order lines go with it
pub async fn delete_book(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let result = BookEntity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Book"));
    }
    tracing::info!("Deleted book {}", id);
    Ok(())
}
