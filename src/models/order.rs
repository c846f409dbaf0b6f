use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_id: i32,
    pub order_date: String,
    #[sea_orm(column_type = "Double")]
    pub total_amount: f64,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Customer,
    #[sea_orm(has_many = "super::order_detail::Entity")]
    OrderDetail,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetail.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailDto {
    pub id: i32,
    pub book_id: i32,
    pub price_per_item: f64,
    pub quantity: i32,
}

impl From<super::order_detail::Model> for OrderDetailDto {
    fn from(model: super::order_detail::Model) -> Self {
        Self {
            id: model.id,
            book_id: model.book_id,
            price_per_item: model.price_per_item,
            quantity: model.quantity,
        }
    }
}

// Order with its lines, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDto {
    pub id: i32,
    pub customer_id: i32,
    pub order_date: String,
    pub total_amount: f64,
    pub details: Vec<OrderDetailDto>,
}

impl OrderDto {
    pub fn new(model: Model, details: Vec<super::order_detail::Model>) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            order_date: model.order_date,
            total_amount: model.total_amount,
            details: details.into_iter().map(OrderDetailDto::from).collect(),
        }
    }
}
