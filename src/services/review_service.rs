//! Review Service
//!
//! One review per customer and book, enforced by the store.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::errors::is_unique_violation;
use crate::domain::{DomainError, ListParams, Page};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::book;
use crate::models::review::{self, Entity as Review};

pub const ALREADY_REVIEWED: &str = "Review already exists";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewReview {
    #[validate(required(message = "book_id is required"))]
    pub book_id: Option<i32>,
    #[validate(
        required(message = "rating is required"),
        range(min = 1, max = 10, message = "rating must be between 1 and 10")
    )]
    pub rating: Option<i32>,
    #[validate(length(max = 2000, message = "comment is too long"))]
    pub comment: Option<String>,
}

pub fn filter_spec() -> FilterSpec<Review> {
    FilterSpec::new(review::Column::Id)
        .sortable("id", review::Column::Id)
        .sortable("rating", review::Column::Rating)
        .sortable("created_at", review::Column::CreatedAt)
        .field("book_id", FieldRule::Equals(review::Column::BookId))
        .field("customer_id", FieldRule::Equals(review::Column::CustomerId))
        .field("rateMin", FieldRule::AtLeast(review::Column::Rating))
        .field("rateMax", FieldRule::AtMost(review::Column::Rating))
}

pub async fn list_reviews(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<review::Model>, DomainError> {
    let select = filter_spec().apply(Review::find(), params)?;
    fetch_page(db, select, page_size, params.page).await
}

pub async fn create_review(
    db: &DatabaseConnection,
    customer_id: i32,
    input: NewReview,
) -> Result<review::Model, DomainError> {
    let (Some(book_id), Some(rating)) = (input.book_id, input.rating) else {
        return Err(DomainError::Validation(
            "book_id and rating are required".to_string(),
        ));
    };

    if book::Entity::find_by_id(book_id).one(db).await?.is_none() {
        return Err(DomainError::not_found("Book"));
    }

    let review = review::ActiveModel {
        book_id: Set(book_id),
        customer_id: Set(customer_id),
        rating: Set(rating),
        comment: Set(input.comment.map(|c| c.trim().to_string())),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    };

    review.insert(db).await.map_err(|err| {
        if is_unique_violation(&err) {
            DomainError::AlreadyExists(ALREADY_REVIEWED.to_string())
        } else {
            err.into()
        }
    })
}

/// Delete a review written by `customer_id`
pub async fn delete_review(
    db: &DatabaseConnection,
    id: i32,
    customer_id: i32,
) -> Result<(), DomainError> {
    let result = Review::delete_many()
        .filter(review::Column::Id.eq(id))
        .filter(review::Column::CustomerId.eq(customer_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Review"));
    }
    Ok(())
}
