//! Schema introspection: model names and their columns.

use sea_orm::{IdenStatic, Iterable};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::envelope::ApiResponse;
use super::error::ApiError;
use super::extract::ValidatedQuery;
use crate::models::{author, book, customer, genre, order, order_detail, publisher, review};

pub const MODELS: [&str; 8] = [
    "author",
    "book",
    "customer",
    "genre",
    "order",
    "order_detail",
    "publisher",
    "review",
];

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModelQuery {
    /// Model name as listed by `/api/category`
    #[validate(required(message = "name is required"))]
    pub name: Option<String>,
}

/// Public columns; the lowercased `*_search` copies are internal
fn columns<C: Iterable + IdenStatic>() -> Vec<String> {
    C::iter()
        .map(|c| c.as_str().to_string())
        .filter(|c| !c.ends_with("_search"))
        .collect()
}

/// Column names of `model`, `None` for an unknown model
pub fn model_fields(model: &str) -> Option<Vec<String>> {
    let fields = match model {
        "author" => columns::<author::Column>(),
        "book" => columns::<book::Column>(),
        "customer" => columns::<customer::Column>()
            .into_iter()
            .filter(|c| c != "password_hash")
            .collect(),
        "genre" => columns::<genre::Column>(),
        "order" => columns::<order::Column>(),
        "order_detail" => columns::<order_detail::Column>(),
        "publisher" => columns::<publisher::Column>(),
        "review" => columns::<review::Column>(),
        _ => return None,
    };
    Some(fields)
}

#[utoipa::path(
    get,
    path = "/api/category",
    tag = "category",
    responses((status = 200, description = "Model names"))
)]
pub async fn list_models() -> ApiResponse<Vec<&'static str>> {
    ApiResponse::ok(MODELS.to_vec())
}

#[utoipa::path(
    get,
    path = "/api/category/model",
    tag = "category",
    params(ModelQuery),
    responses(
        (status = 200, description = "Column names of the model"),
        (status = 404, description = "Unknown model"),
        (status = 422, description = "Missing name")
    )
)]
pub async fn model_schema(
    ValidatedQuery(query): ValidatedQuery<ModelQuery>,
) -> Result<ApiResponse<Vec<String>>, ApiError> {
    let name = query.name.unwrap_or_default().trim().to_lowercase();
    model_fields(&name)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(format!("Model {} not found", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_fields_hide_password_hash() {
        let fields = model_fields("customer").unwrap();
        assert!(fields.contains(&"email".to_string()));
        assert!(!fields.iter().any(|f| f == "password_hash"));
        assert!(!fields.iter().any(|f| f.ends_with("_search")));
    }

    #[test]
    fn search_columns_are_not_listed() {
        assert_eq!(
            model_fields("genre").unwrap(),
            ["id", "name", "description", "created_at", "updated_at"]
        );
    }

    #[test]
    fn every_listed_model_has_fields() {
        for model in MODELS {
            assert!(model_fields(model).is_some_and(|f| f.contains(&"id".to_string())));
        }
        assert!(model_fields("invoice").is_none());
    }
}
