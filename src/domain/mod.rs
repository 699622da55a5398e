//! Domain layer - Pure business abstractions
//!
//! Trait definitions, request/response shapes, domain error types and the
//! rules that do not need a database (choice parsing, prerequisite graph,
//! field validation).

pub mod choices;
pub mod errors;
pub mod prerequisites;
pub mod repositories;
pub mod validation;

pub use errors::DomainError;
pub use repositories::*;

/// URL prefix under which uploaded media is served.
pub const MEDIA_URL: &str = "/media/";

/// Calendar date used for "today"-relative derivations (age, expiry, current year).
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Timestamp format stored in `created_at` / `updated_at` columns.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
