//! Error types for Athenaeum server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes surfaced to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    BookUnavailable = 6,
    DuplicateLoan = 7,
    LoanLimitExceeded = 8,
    RenewalDenied = 9,
    DuplicateReservation = 10,
    BookStillAvailable = 11,
    Duplicate = 12,
    BadValue = 13,
    NoSuchData = 14,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// No copy of the book is left on the shelf
    #[error("Book not available: {0}")]
    Unavailable(String),

    /// The borrower already holds an unreturned loan for the book
    #[error("Duplicate loan: {0}")]
    DuplicateLoan(String),

    /// The borrower already holds the maximum number of unreturned loans
    #[error("Loan limit exceeded: {0}")]
    LoanLimitExceeded(String),

    #[error("Renewal denied: {0}")]
    RenewalDenied(String),

    /// The user already has an open reservation or loan for the book
    #[error("Duplicate reservation: {0}")]
    DuplicateReservation(String),

    /// Reservations only apply to fully loaned-out books
    #[error("Book is still available: {0}")]
    BookAvailable(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Unavailable(msg) => {
                (StatusCode::CONFLICT, ErrorCode::BookUnavailable, msg.clone())
            }
            AppError::DuplicateLoan(msg) => {
                (StatusCode::CONFLICT, ErrorCode::DuplicateLoan, msg.clone())
            }
            AppError::LoanLimitExceeded(msg) => {
                (StatusCode::CONFLICT, ErrorCode::LoanLimitExceeded, msg.clone())
            }
            AppError::RenewalDenied(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::RenewalDenied, msg.clone())
            }
            AppError::DuplicateReservation(msg) => {
                (StatusCode::CONFLICT, ErrorCode::DuplicateReservation, msg.clone())
            }
            AppError::BookAvailable(msg) => {
                (StatusCode::CONFLICT, ErrorCode::BookStillAvailable, msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
