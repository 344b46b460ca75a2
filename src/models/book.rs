//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Clamp an available-copies counter into [0, total]. Applied on every
/// persist as the single integrity backstop against callers decrementing
/// past zero or inflating past the total.
pub fn clamp_available_copies(available: i32, total: i32) -> i32 {
    available.clamp(0, total.max(0))
}

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub isbn: String,
    pub genre_id: Option<i32>,
    pub publication_year: i32,
    pub publisher: String,
    pub description: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// Book with author/genre names and the caller's relationship to it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub author_name: String,
    pub genre_name: Option<String>,
    pub is_available: bool,
    /// Caller holds an unreturned loan for this book
    pub user_has_loan: bool,
    /// Caller holds a pending or available reservation for this book
    pub user_has_reservation: bool,
}

/// Abbreviated book for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub genre_name: Option<String>,
    pub publication_year: i32,
    pub total_copies: i32,
    pub available_copies: i32,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub author_id: i32,
    #[validate(length(min = 10, max = 13))]
    pub isbn: String,
    pub genre_id: Option<i32>,
    pub publication_year: i32,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0))]
    pub total_copies: i32,
}

/// Update book request. Omitted fields keep their current value; nullable
/// columns such as `genre_id` cannot be cleared through this endpoint.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
    pub genre_id: Option<i32>,
    pub publication_year: Option<i32>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
}

/// Book search query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookQuery {
    /// Free-text search over title, author, ISBN, publisher and description
    pub query: Option<String>,
    pub genre_id: Option<i32>,
    pub author_id: Option<i32>,
    pub publication_year: Option<i32>,
    /// Only books with at least one copy on the shelf
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_counter_in_range() {
        assert_eq!(clamp_available_copies(-1, 3), 0);
        assert_eq!(clamp_available_copies(0, 3), 0);
        assert_eq!(clamp_available_copies(2, 3), 2);
        assert_eq!(clamp_available_copies(5, 3), 3);
    }

    #[test]
    fn clamp_handles_zero_total() {
        assert_eq!(clamp_available_copies(1, 0), 0);
        assert_eq!(clamp_available_copies(-1, 0), 0);
    }
}
