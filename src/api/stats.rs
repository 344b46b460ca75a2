//! Statistics endpoints (staff)

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    services::stats::{DashboardStats, PopularBook, StatsPeriod},
};

use super::AuthenticatedUser;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct PopularBooksQuery {
    /// One of: all, year, month, week (default: all)
    pub period: Option<String>,
    /// Maximum number of books to return (default: 10)
    pub limit: Option<i64>,
}

/// Get the library dashboard statistics
#[utoipa::path(
    get,
    path = "/stats/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardStats>> {
    claims.require_staff()?;

    let stats = state.services.stats.dashboard().await?;
    Ok(Json(stats))
}

/// Get the most borrowed books over a period
#[utoipa::path(
    get,
    path = "/stats/popular-books",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(PopularBooksQuery),
    responses(
        (status = 200, description = "Most borrowed books", body = Vec<PopularBook>),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn popular_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PopularBooksQuery>,
) -> AppResult<Json<Vec<PopularBook>>> {
    claims.require_staff()?;

    let period = query
        .period
        .as_deref()
        .unwrap_or("all")
        .parse::<StatsPeriod>()?;
    let books = state
        .services
        .stats
        .popular_books(period, query.limit.unwrap_or(10))
        .await?;
    Ok(Json(books))
}
