//! Services Layer
//!
//! Business logic over a `DatabaseConnection`, free of any HTTP types.
//! Handlers validate input, build `ListParams` and call in here.

pub mod author_service;
pub mod book_service;
pub mod customer_service;
pub mod genre_service;
pub mod order_service;
pub mod publisher_service;
pub mod review_service;

use chrono::NaiveDate;
use validator::ValidationError;

/// Calendar date in `YYYY-MM-DD` form
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("date");
            err.message = Some("must be a date (YYYY-MM-DD)".into());
            err
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn dates_must_be_calendar_days() {
        assert!(validate_date("1965-08-01").is_ok());
        assert!(validate_date("1965-02-30").is_err());
        assert!(validate_date("01/08/1965").is_err());
    }

    #[test]
    fn missing_registration_fields_fail_validation() {
        let input: customer_service::NewCustomer =
            serde_json::from_value(serde_json::json!({ "email": "a@b.co" })).unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn order_lines_are_validated() {
        let input: order_service::NewOrder = serde_json::from_value(serde_json::json!({
            "details": [{ "book_id": 1, "quantity": 0 }]
        }))
        .unwrap();
        assert!(input.validate().is_err());

        let empty: order_service::NewOrder =
            serde_json::from_value(serde_json::json!({ "details": [] })).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn review_rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (10, true), (11, false)] {
            let input: review_service::NewReview = serde_json::from_value(
                serde_json::json!({ "book_id": 1, "rating": rating }),
            )
            .unwrap();
            assert_eq!(input.validate().is_ok(), ok, "rating {}", rating);
        }
    }

    #[test]
    fn order_totals_round_to_cents() {
        assert_eq!(order_service::round_amount(0.1 + 0.2), 0.3);
        assert_eq!(order_service::round_amount(19.999), 20.0);
    }
}
