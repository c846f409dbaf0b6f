//! Author Service - Pure business logic without HTTP layer

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{DomainError, ListParams, Page, capitalize_words, search_key};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::author::{self, ActiveModel, Entity as Author};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewAuthor {
    #[validate(
        required(message = "name is required"),
        length(min = 1, max = 120, message = "name must be 1 to 120 characters")
    )]
    pub name: Option<String>,
    pub biography: Option<String>,
    #[validate(length(max = 60, message = "nationality is too long"))]
    pub nationality: Option<String>,
    #[validate(custom(function = "super::validate_date"))]
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AuthorChanges {
    #[validate(length(min = 1, max = 120, message = "name must be 1 to 120 characters"))]
    pub name: Option<String>,
    pub biography: Option<String>,
    #[validate(length(max = 60, message = "nationality is too long"))]
    pub nationality: Option<String>,
    #[validate(custom(function = "super::validate_date"))]
    pub birth_date: Option<String>,
}

pub fn filter_spec() -> FilterSpec<Author> {
    FilterSpec::new(author::Column::Id)
        .sortable("id", author::Column::Id)
        .sortable("name", author::Column::Name)
        .sortable("nationality", author::Column::Nationality)
        .field("name", FieldRule::Contains(author::Column::NameSearch))
}

/// List authors, optionally filtered by name
pub async fn list_authors(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<author::Model>, DomainError> {
    let select = filter_spec().apply(Author::find(), params)?;
    fetch_page(db, select, page_size, params.page).await
}

pub async fn get_author(db: &DatabaseConnection, id: i32) -> Result<author::Model, DomainError> {
    Author::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Author"))
}

pub async fn create_author(
    db: &DatabaseConnection,
    input: NewAuthor,
) -> Result<author::Model, DomainError> {
    let now = chrono::Utc::now().to_rfc3339();
    let name = capitalize_words(input.name.unwrap_or_default().trim());

    let author = ActiveModel {
        name_search: Set(search_key(&name)),
        name: Set(name),
        biography: Set(input.biography),
        nationality: Set(input.nationality.map(|n| capitalize_words(n.trim()))),
        birth_date: Set(input.birth_date),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = author.insert(db).await?;
    tracing::info!("Created author {} ({})", model.id, model.name);
    Ok(model)
}

pub async fn update_author(
    db: &DatabaseConnection,
    id: i32,
    changes: AuthorChanges,
) -> Result<author::Model, DomainError> {
    let existing = get_author(db, id).await?;
    let mut active: ActiveModel = existing.into();

    if let Some(name) = changes.name {
        let name = capitalize_words(name.trim());
        active.name_search = Set(search_key(&name));
        active.name = Set(name);
    }
    if let Some(biography) = changes.biography {
        active.biography = Set(Some(biography));
    }
    if let Some(nationality) = changes.nationality {
        active.nationality = Set(Some(capitalize_words(nationality.trim())));
    }
    if let Some(birth_date) = changes.birth_date {
        active.birth_date = Set(Some(birth_date));
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

/// Delete an author; the store cascades to their books
pub async fn delete_author(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let result = Author::delete_by_id(id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Author"));
    }

    Ok(())
}
