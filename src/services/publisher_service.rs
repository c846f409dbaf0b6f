//! Publisher Service

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{DomainError, ListParams, Page, capitalize_words, search_key};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::publisher::{self, ActiveModel, Entity as Publisher};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewPublisher {
    #[validate(
        required(message = "name is required"),
        length(min = 1, max = 120, message = "name must be 1 to 120 characters")
    )]
    pub name: Option<String>,
    pub country: Option<String>,
    #[validate(url(message = "website must be a valid URL"))]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PublisherChanges {
    #[validate(length(min = 1, max = 120, message = "name must be 1 to 120 characters"))]
    pub name: Option<String>,
    pub country: Option<String>,
    #[validate(url(message = "website must be a valid URL"))]
    pub website: Option<String>,
}

pub fn filter_spec() -> FilterSpec<Publisher> {
    FilterSpec::new(publisher::Column::Name)
        .field("name", FieldRule::Contains(publisher::Column::NameSearch))
}

pub async fn list_publishers(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<publisher::Model>, DomainError> {
    let select = filter_spec().apply(Publisher::find(), params)?;
    fetch_page(db, select, page_size, params.page).await
}

pub async fn get_publisher(
    db: &DatabaseConnection,
    id: i32,
) -> Result<publisher::Model, DomainError> {
    Publisher::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Publisher"))
}

pub async fn create_publisher(
    db: &DatabaseConnection,
    input: NewPublisher,
) -> Result<publisher::Model, DomainError> {
    let now = chrono::Utc::now().to_rfc3339();
    let name = capitalize_words(input.name.unwrap_or_default().trim());

    let publisher = ActiveModel {
        name_search: Set(search_key(&name)),
        name: Set(name),
        country: Set(input.country.map(|c| capitalize_words(c.trim()))),
        website: Set(input.website.map(|w| w.trim().to_lowercase())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(publisher.insert(db).await?)
}

pub async fn update_publisher(
    db: &DatabaseConnection,
    id: i32,
    changes: PublisherChanges,
) -> Result<publisher::Model, DomainError> {
    let mut active: ActiveModel = get_publisher(db, id).await?.into();

    if let Some(name) = changes.name {
        let name = capitalize_words(name.trim());
        active.name_search = Set(search_key(&name));
        active.name = Set(name);
    }
    if let Some(country) = changes.country {
        active.country = Set(Some(capitalize_words(country.trim())));
    }
    if let Some(website) = changes.website {
        active.website = Set(Some(website.trim().to_lowercase()));
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await?)
}

pub async fn delete_publisher(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let result = Publisher::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Publisher"));
    }
    Ok(())
}
