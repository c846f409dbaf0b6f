use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[serde(skip_serializing, default)]
    pub title_search: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub stock: i32,
    pub publication_date: Option<String>,
    pub author_id: i32,
    pub genre_id: i32,
    pub publisher_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(
        belongs_to = "super::genre::Entity",
        from = "Column::GenreId",
        to = "super::genre::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Genre,
    #[sea_orm(
        belongs_to = "super::publisher::Entity",
        from = "Column::PublisherId",
        to = "super::publisher::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Publisher,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
    #[sea_orm(has_many = "super::order_detail::Entity")]
    OrderDetail,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Genre.def()
    }
}

impl Related<super::publisher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Publisher.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetail.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDto {
    pub id: i32,
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub publication_date: Option<String>,
    pub author_id: i32,
    pub genre_id: i32,
    pub publisher_id: i32,
    /// Path of the cover image served by `/api/image/{id}`
    pub cover_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Model> for BookDto {
    fn from(model: Model) -> Self {
        Self {
            cover_url: format!("/api/image/{}", model.id),
            id: model.id,
            title: model.title,
            isbn: model.isbn,
            description: model.description,
            price: model.price,
            stock: model.stock,
            publication_date: model.publication_date,
            author_id: model.author_id,
            genre_id: model.genre_id,
            publisher_id: model.publisher_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
