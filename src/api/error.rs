//! HTTP error type and the uniform failure envelope
//!
//! Every failure leaves the API as
//! `{"success": false, "statusCode": <u16>, "message": <string>}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::domain::DomainError;

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    /// Log the cause, return the generic 500 message
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::unprocessable(msg),
            DomainError::AlreadyExists(msg) => Self::bad_request(msg),
            DomainError::Store(cause) => Self::bad_request(cause),
            DomainError::Unauthorized(msg) => Self::unauthorized(msg),
            DomainError::NotFound(msg) => Self::not_found(msg),
            DomainError::TooManyRequests(msg) => Self::too_many_requests(msg),
            err @ (DomainError::Database(_) | DomainError::Internal(_)) => Self::internal(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(_) => Self::bad_request(rejection.body_text()),
            JsonRejection::JsonDataError(_) => Self::unprocessable(rejection.body_text()),
            other => Self::new(other.status(), other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::unprocessable(
            first_message(&errors).unwrap_or_else(|| "Invalid request".to_string()),
        )
    }
}

/// Message of the first failing field, fields taken in name order. Nested
/// structs and lists are searched depth first.
pub fn first_message(errors: &ValidationErrors) -> Option<String> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields.into_iter().find_map(|(field, kind)| match kind {
        ValidationErrorsKind::Field(errs) => errs.first().map(|e| match &e.message {
            Some(message) => message.to_string(),
            None => format!("{} is invalid", field),
        }),
        ValidationErrorsKind::Struct(nested) => first_message(nested),
        ValidationErrorsKind::List(items) => items.values().find_map(|item| first_message(item)),
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "statusCode": self.status.as_u16(),
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::Validation("v".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::AlreadyExists("a".into()), StatusCode::BAD_REQUEST),
            (DomainError::Store("s".into()), StatusCode::BAD_REQUEST),
            (DomainError::Unauthorized("u".into()), StatusCode::UNAUTHORIZED),
            (DomainError::NotFound("n".into()), StatusCode::NOT_FOUND),
            (DomainError::TooManyRequests("t".into()), StatusCode::TOO_MANY_REQUESTS),
            (DomainError::Database("d".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(DomainError::Database("disk I/O error".into()));
        assert_eq!(err.message(), INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn first_message_uses_field_order() {
        let mut errors = ValidationErrors::new();
        let mut password = validator::ValidationError::new("length");
        password.message = Some("password too short".into());
        errors.add("password", password);
        let mut email = validator::ValidationError::new("required");
        email.message = Some("email is required".into());
        errors.add("email", email);

        assert_eq!(first_message(&errors).as_deref(), Some("email is required"));
    }
}
