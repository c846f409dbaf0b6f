//! Genre Service

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::errors::is_unique_violation;
use crate::domain::{DomainError, ListParams, Page, capitalize_words, search_key};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::genre::{self, ActiveModel, Entity as Genre};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewGenre {
    #[validate(
        required(message = "name is required"),
        length(min = 1, max = 60, message = "name must be 1 to 60 characters")
    )]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct GenreChanges {
    #[validate(length(min = 1, max = 60, message = "name must be 1 to 60 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

// Genres always sort by name; only the direction is configurable
pub fn filter_spec() -> FilterSpec<Genre> {
    FilterSpec::new(genre::Column::Name)
        .field("name", FieldRule::Contains(genre::Column::NameSearch))
}

pub async fn list_genres(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<genre::Model>, DomainError> {
    let select = filter_spec().apply(Genre::find(), params)?;
    fetch_page(db, select, page_size, params.page).await
}

pub async fn get_genre(db: &DatabaseConnection, id: i32) -> Result<genre::Model, DomainError> {
    Genre::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Genre"))
}

fn duplicate(err: sea_orm::DbErr) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::AlreadyExists("Genre already exists".to_string())
    } else {
        err.into()
    }
}

pub async fn create_genre(
    db: &DatabaseConnection,
    input: NewGenre,
) -> Result<genre::Model, DomainError> {
    let now = chrono::Utc::now().to_rfc3339();
    let name = capitalize_words(input.name.unwrap_or_default().trim());

    let genre = ActiveModel {
        name_search: Set(search_key(&name)),
        name: Set(name),
        description: Set(input.description),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    genre.insert(db).await.map_err(duplicate)
}

pub async fn update_genre(
    db: &DatabaseConnection,
    id: i32,
    changes: GenreChanges,
) -> Result<genre::Model, DomainError> {
    let mut active: ActiveModel = get_genre(db, id).await?.into();

    if let Some(name) = changes.name {
        let name = capitalize_words(name.trim());
        active.name_search = Set(search_key(&name));
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    active.update(db).await.map_err(duplicate)
}

pub async fn delete_genre(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let result = Genre::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Genre"));
    }
    Ok(())
}
