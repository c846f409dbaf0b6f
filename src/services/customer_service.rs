//! Customer Service
//!
//! Registration, credential checks and profile maintenance. Email uniqueness
//! is enforced by the `customers.email` constraint.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::errors::is_unique_violation;
use crate::domain::{DomainError, ListParams, Page, capitalize_words, search_key};
use crate::infrastructure::auth::{hash_password_blocking, verify_password_blocking};
use crate::infrastructure::query::{FieldRule, FilterSpec, fetch_page};
use crate::models::CustomerDto;
use crate::models::customer::{self, ActiveModel, Entity as Customer};

pub const ALREADY_REGISTERED: &str = "Customer already registered";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCustomer {
    #[validate(
        required(message = "first_name is required"),
        length(min = 1, max = 60, message = "first_name must be 1 to 60 characters")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "last_name is required"),
        length(min = 1, max = 60, message = "last_name must be 1 to 60 characters")
    )]
    pub last_name: Option<String>,
    #[validate(
        required(message = "email is required"),
        email(message = "email must be a valid address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "password is required"),
        length(min = 8, max = 128, message = "password must be 8 to 128 characters")
    )]
    pub password: Option<String>,
    #[validate(length(max = 30, message = "phone is too long"))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CustomerChanges {
    #[validate(length(min = 1, max = 60, message = "first_name must be 1 to 60 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 60, message = "last_name must be 1 to 60 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub password: Option<String>,
    #[validate(length(max = 30, message = "phone is too long"))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct Credentials {
    #[validate(
        required(message = "email is required"),
        email(message = "email must be a valid address")
    )]
    pub email: Option<String>,
    #[validate(required(message = "password is required"))]
    pub password: Option<String>,
}

pub fn filter_spec() -> FilterSpec<Customer> {
    FilterSpec::new(customer::Column::Id)
        .sortable("id", customer::Column::Id)
        .sortable("first_name", customer::Column::FirstName)
        .sortable("last_name", customer::Column::LastName)
        .sortable("email", customer::Column::Email)
        .sortable("created_at", customer::Column::CreatedAt)
        .field("first_name", FieldRule::Contains(customer::Column::FirstNameSearch))
        .field("last_name", FieldRule::Contains(customer::Column::LastNameSearch))
        .field("email", FieldRule::Contains(customer::Column::Email))
        .field("phone", FieldRule::Contains(customer::Column::Phone))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn duplicate(err: sea_orm::DbErr) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::AlreadyExists(ALREADY_REGISTERED.to_string())
    } else {
        err.into()
    }
}

pub async fn list_customers(
    db: &DatabaseConnection,
    params: &ListParams,
    page_size: u64,
) -> Result<Page<CustomerDto>, DomainError> {
    let select = filter_spec().apply(Customer::find(), params)?;
    Ok(fetch_page(db, select, page_size, params.page)
        .await?
        .map(CustomerDto::from))
}

pub async fn get_customer(
    db: &DatabaseConnection,
    id: i32,
) -> Result<customer::Model, DomainError> {
    Customer::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Customer"))
}

/// Register a customer. The second registration of an email fails with
/// `AlreadyExists`.
pub async fn register_customer(
    db: &DatabaseConnection,
    input: NewCustomer,
) -> Result<CustomerDto, DomainError> {
    let password_hash = hash_password_blocking(input.password.unwrap_or_default()).await?;
    let now = chrono::Utc::now().to_rfc3339();
    let first_name = capitalize_words(input.first_name.unwrap_or_default().trim());
    let last_name = capitalize_words(input.last_name.unwrap_or_default().trim());

    let customer = ActiveModel {
        first_name_search: Set(search_key(&first_name)),
        last_name_search: Set(search_key(&last_name)),
        first_name: Set(first_name),
        last_name: Set(last_name),
        email: Set(normalize_email(&input.email.unwrap_or_default())),
        password_hash: Set(password_hash),
        phone: Set(input.phone.map(|p| p.trim().to_string())),
        address: Set(input.address),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = customer.insert(db).await.map_err(duplicate)?;
    tracing::info!("Registered customer {}", model.id);
    Ok(model.into())
}

/// Check an email/password pair. Unknown emails and wrong passwords are
/// indistinguishable to the caller.
pub async fn authenticate(
    db: &DatabaseConnection,
    credentials: Credentials,
) -> Result<customer::Model, DomainError> {
    let email = normalize_email(&credentials.email.unwrap_or_default());
    let Some(customer) = Customer::find()
        .filter(customer::Column::Email.eq(email))
        .one(db)
        .await?
    else {
        return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let valid = verify_password_blocking(
        credentials.password.unwrap_or_default(),
        customer.password_hash.clone(),
    )
    .await?;

    if !valid {
        tracing::warn!("Failed login for customer {}", customer.id);
        return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(customer)
}

pub async fn update_customer(
    db: &DatabaseConnection,
    id: i32,
    changes: CustomerChanges,
) -> Result<CustomerDto, DomainError> {
    let mut active: ActiveModel = get_customer(db, id).await?.into();

    if let Some(first_name) = changes.first_name {
        let first_name = capitalize_words(first_name.trim());
        active.first_name_search = Set(search_key(&first_name));
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = changes.last_name {
        let last_name = capitalize_words(last_name.trim());
        active.last_name_search = Set(search_key(&last_name));
        active.last_name = Set(last_name);
    }
    if let Some(email) = changes.email {
        active.email = Set(normalize_email(&email));
    }
    if let Some(password) = changes.password {
        active.password_hash = Set(hash_password_blocking(password).await?);
    }
    if let Some(phone) = changes.phone {
        active.phone = Set(Some(phone.trim().to_string()));
    }
    if let Some(address) = changes.address {
        active.address = Set(Some(address));
    }
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());

    Ok(active.update(db).await.map_err(duplicate)?.into())
}

/// Delete a customer together with their orders and reviews
pub async fn delete_customer(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let result = Customer::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Customer"));
    }
    tracing::info!("Deleted customer {}", id);
    Ok(())
}
