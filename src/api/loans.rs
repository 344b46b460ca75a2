//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::LoanDetails,
    repository::loans::{LoanCounts, LoanFilter},
};

use super::AuthenticatedUser;

/// Loan response with calculated dates
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Number of renewals used
    pub renewals: i32,
    /// Status message
    pub message: String,
}

/// The caller's loans with aggregate counts
#[derive(Serialize, ToSchema)]
pub struct MyLoansResponse {
    pub loans: Vec<LoanDetails>,
    pub active_count: i64,
    pub overdue_count: i64,
}

/// Staff loan listing with aggregate counts
#[derive(Serialize, ToSchema)]
pub struct AllLoansResponse {
    pub loans: Vec<LoanDetails>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub counts: LoanCounts,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct LoanListQuery {
    /// One of: all, active, overdue, returned
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

fn parse_filter(status: Option<&str>) -> AppResult<LoanFilter> {
    match status {
        None | Some("all") => Ok(LoanFilter::All),
        Some("active") => Ok(LoanFilter::Active),
        Some("overdue") => Ok(LoanFilter::Overdue),
        Some("returned") => Ok(LoanFilter::Returned),
        Some(other) => Err(AppError::Validation(format!(
            "unknown loan status filter: {other}"
        ))),
    }
}

/// Borrow a book (creates a loan for the caller)
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No copies available, duplicate loan, or loan limit reached")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state
        .services
        .circulation
        .borrow(claims.principal(), book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            due_date: loan.due_date,
            renewals: loan.renewals,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LoanResponse),
        (status = 403, description = "Not the borrower or staff"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state
        .services
        .circulation
        .return_loan(claims.principal(), loan_id)
        .await?;

    Ok(Json(LoanResponse {
        id: loan.id,
        due_date: loan.due_date,
        renewals: loan.renewals,
        message: "Book returned successfully".to_string(),
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Renewal limit reached, overdue, or already returned")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state
        .services
        .circulation
        .renew(claims.principal(), loan_id)
        .await?;

    Ok(Json(LoanResponse {
        id: loan.id,
        due_date: loan.due_date,
        renewals: loan.renewals,
        message: format!("Loan renewed ({} of {} renewals used)", loan.renewals, loan.max_renewals),
    }))
}

/// Get the caller's loans
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's loans", body = MyLoansResponse)
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MyLoansResponse>> {
    let (loans, active_count, overdue_count) =
        state.services.circulation.my_loans(claims.principal()).await?;

    Ok(Json(MyLoansResponse {
        loans,
        active_count,
        overdue_count,
    }))
}

/// Get loans for a specific user (staff)
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_staff()?;

    let loans = state.services.circulation.user_loans(user_id).await?;
    Ok(Json(loans))
}

/// List all loans with status filter and pagination (staff)
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanListQuery),
    responses(
        (status = 200, description = "All loans", body = AllLoansResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanListQuery>,
) -> AppResult<Json<AllLoansResponse>> {
    claims.require_staff()?;

    let filter = parse_filter(query.status.as_deref())?;
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(20);

    let (loans, total, counts) = state
        .services
        .circulation
        .all_loans(filter, page, per_page)
        .await?;

    Ok(Json(AllLoansResponse {
        loans,
        total,
        page,
        per_page,
        counts,
    }))
}
