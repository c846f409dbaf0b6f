//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP layer maps each variant to a status code.

use sea_orm::{DbErr, SqlErr};

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Resource not found
    #[error("{0}")]
    NotFound(String),
    /// Input rejected before reaching the store
    #[error("{0}")]
    Validation(String),
    /// A unique row already exists (email, review per book/customer)
    #[error("{0}")]
    AlreadyExists(String),
    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),
    /// Caller exceeded the request budget for its key
    #[error("{0}")]
    TooManyRequests(String),
    /// Known store-layer failure, carries the cause reported by the store
    #[error("{0}")]
    Store(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str) -> Self {
        DomainError::NotFound(format!("{} not found", entity))
    }
}

/// True when the store rejected a write because of a UNIQUE constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("UNIQUE constraint failed")
}

// Conversion from SeaORM errors (used in infrastructure and service layers)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(cause)) => DomainError::Store(cause),
            Some(SqlErr::ForeignKeyConstraintViolation(cause)) => DomainError::Store(cause),
            _ => {
                let message = e.to_string();
                if message.contains("constraint failed") {
                    DomainError::Store(message)
                } else if let DbErr::RecordNotFound(what) = e {
                    DomainError::NotFound(what)
                } else {
                    DomainError::Database(message)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_maps_to_not_found() {
        let err: DomainError = DbErr::RecordNotFound("Book".to_string()).into();
        assert!(matches!(err, DomainError::NotFound(ref what) if what == "Book"));
    }

    #[test]
    fn constraint_messages_map_to_store_errors() {
        let err: DomainError =
            DbErr::Custom("FOREIGN KEY constraint failed".to_string()).into();
        assert!(matches!(err, DomainError::Store(_)));
    }

    #[test]
    fn other_errors_map_to_database() {
        let err: DomainError = DbErr::Custom("connection reset".to_string()).into();
        assert!(matches!(err, DomainError::Database(_)));
    }
}
