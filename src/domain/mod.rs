//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no Axum). Only the error
//! taxonomy, list parameters and the small pure helpers shared by every
//! resource.

pub mod errors;
pub mod listing;
pub mod pagination;
pub mod text;

pub use errors::DomainError;
pub use listing::{ListParams, SortOrder};
pub use pagination::{Page, Pagination, paginate};
pub use text::{capitalize_words, search_key};
