//! Order Service
//!
//! An order and its lines are written in one transaction. Line prices are
//! copied from the book at order time and the total is their sum.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{DomainError, ListParams, Page};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::order::{self, Entity as Order};
use crate::models::{OrderDto, book, order_detail};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLine {
    #[validate(required(message = "details.book_id is required"))]
    pub book_id: Option<i32>,
    #[validate(
        required(message = "details.quantity is required"),
        range(min = 1, max = 1000, message = "details.quantity must be between 1 and 1000")
    )]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewOrder {
    #[validate(
        required(message = "details is required"),
        length(min = 1, message = "details must contain at least one line"),
        nested
    )]
    pub details: Option<Vec<OrderLine>>,
}

pub fn filter_spec() -> FilterSpec<Order> {
    FilterSpec::new(order::Column::Id)
        .sortable("id", order::Column::Id)
        .sortable("order_date", order::Column::OrderDate)
        .sortable("total_amount", order::Column::TotalAmount)
        .field("customer", FieldRule::Equals(order::Column::CustomerId))
        .date_range("dateinit", "dateend", order::Column::OrderDate)
}

/// Round to cents so totals compare cleanly against summed line items
pub fn round_amount(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

async fn load_details<C: ConnectionTrait>(
    db: &C,
    order_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<order_detail::Model>>, DomainError> {
    let mut grouped: HashMap<i32, Vec<order_detail::Model>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let details = order_detail::Entity::find()
        .filter(order_detail::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_detail::Column::Id)
        .all(db)
        .await?;
    for detail in details {
        grouped.entry(detail.order_id).or_default().push(detail);
    }
    Ok(grouped)
}

/// List orders, each with its lines
pub async fn list_orders(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<OrderDto>, DomainError> {
    let select = filter_spec().apply(Order::find(), params)?;
    let page = fetch_page(db, select, page_size, params.page).await?;

    let ids = page.items.iter().map(|o| o.id).collect();
    let mut details = load_details(db, ids).await?;

    Ok(page.map(|order| {
        let lines = details.remove(&order.id).unwrap_or_default();
        OrderDto::new(order, lines)
    }))
}

pub async fn get_order(db: &DatabaseConnection, id: i32) -> Result<OrderDto, DomainError> {
    let order = Order::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Order"))?;
    let lines = load_details(db, vec![id]).await?.remove(&id).unwrap_or_default();
    Ok(OrderDto::new(order, lines))
}

/// Place an order for `customer_id`
pub async fn create_order(
    db: &DatabaseConnection,
    customer_id: i32,
    input: NewOrder,
) -> Result<OrderDto, DomainError> {
    let lines = input.details.unwrap_or_default();
    if lines.is_empty() {
        return Err(DomainError::Validation(
            "details must contain at least one line".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let (Some(book_id), Some(quantity)) = (line.book_id, line.quantity) else {
            return Err(DomainError::Validation(
                "details.book_id and details.quantity are required".to_string(),
            ));
        };
        let book = book::Entity::find_by_id(book_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found("Book"))?;
        priced.push((book.id, book.price, quantity));
    }

    let total = round_amount(
        priced
            .iter()
            .map(|(_, price, quantity)| price * f64::from(*quantity))
            .sum(),
    );
    let now = chrono::Utc::now().to_rfc3339();

    let order = order::ActiveModel {
        customer_id: Set(customer_id),
        order_date: Set(now.clone()),
        total_amount: Set(total),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut details = Vec::with_capacity(priced.len());
    for (book_id, price, quantity) in priced {
        let detail = order_detail::ActiveModel {
            order_id: Set(order.id),
            book_id: Set(book_id),
            price_per_item: Set(price),
            quantity: Set(quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        details.push(detail);
    }

    txn.commit().await?;

    tracing::info!(
        "Customer {} placed order {} ({} lines, total {:.2})",
        customer_id,
        order.id,
        details.len(),
        order.total_amount
    );
    Ok(OrderDto::new(order, details))
}

/// Delete an order owned by `customer_id`. Orders of other customers are
/// reported as missing.
pub async fn delete_order(
    db: &DatabaseConnection,
    id: i32,
    customer_id: i32,
) -> Result<(), DomainError> {
    let result = Order::delete_many()
        .filter(order::Column::Id.eq(id))
        .filter(order::Column::CustomerId.eq(customer_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Order"));
    }
    Ok(())
}
