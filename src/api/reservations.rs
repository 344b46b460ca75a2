//! Reservation lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::Loan,
        reservation::{Reservation, ReservationDetails},
    },
    services::reservations::ReservationAction,
};

use super::AuthenticatedUser;

/// Reservation response, with the loan created on fulfillment
#[derive(Serialize, ToSchema)]
pub struct ReservationResponse {
    pub reservation: Reservation,
    /// Present only when the reservation was fulfilled into a loan
    pub loan: Option<Loan>,
    pub message: String,
}

/// Staff fulfill/cancel request
#[derive(Deserialize, ToSchema)]
pub struct ManageReservationRequest {
    pub action: ReservationAction,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ReservationListQuery {
    /// One of: pending, available, fulfilled, cancelled, expired
    pub status: Option<String>,
}

/// Result of an expiry sweep
#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of reservations transitioned to expired
    pub expired: u64,
}

/// Reserve a book (caller joins the queue)
#[utoipa::path(
    post,
    path = "/books/{id}/reserve",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Reservation created", body = ReservationResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book available, duplicate reservation, or active loan exists")
    )
)]
pub async fn reserve_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    let reservation = state
        .services
        .reservations
        .reserve(claims.principal(), book_id)
        .await?;

    let message = format!("Reservation placed at queue position {}", reservation.priority);
    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            reservation,
            loan: None,
            message,
        }),
    ))
}

/// Cancel a reservation (owner or staff)
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationResponse),
        (status = 403, description = "Not the holder or staff"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation is not open")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<ReservationResponse>> {
    let reservation = state
        .services
        .reservations
        .cancel(claims.principal(), reservation_id)
        .await?;

    Ok(Json(ReservationResponse {
        reservation,
        loan: None,
        message: "Reservation cancelled".to_string(),
    }))
}

/// Fulfill or cancel a reservation (staff)
#[utoipa::path(
    post,
    path = "/reservations/{id}/manage",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    request_body = ManageReservationRequest,
    responses(
        (status = 200, description = "Reservation updated", body = ReservationResponse),
        (status = 403, description = "Staff privileges required"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation not open or no copies available")
    )
)]
pub async fn manage_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i32>,
    Json(request): Json<ManageReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    let (reservation, loan) = state
        .services
        .reservations
        .manage(claims.principal(), reservation_id, request.action)
        .await?;

    let message = match loan {
        Some(_) => "Reservation fulfilled and book loaned".to_string(),
        None => "Reservation cancelled".to_string(),
    };

    Ok(Json(ReservationResponse {
        reservation,
        loan,
        message,
    }))
}

/// Get the caller's reservations
#[utoipa::path(
    get,
    path = "/reservations/mine",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn my_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let reservations = state
        .services
        .reservations
        .my_reservations(claims.principal())
        .await?;
    Ok(Json(reservations))
}

/// List all reservations with optional status filter (staff)
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationListQuery),
    responses(
        (status = 200, description = "All reservations", body = Vec<ReservationDetails>),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationListQuery>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let reservations = state
        .services
        .reservations
        .all_reservations(claims.principal(), query.status.as_deref())
        .await?;
    Ok(Json(reservations))
}

/// Expire open reservations past their hold window (staff)
#[utoipa::path(
    post,
    path = "/reservations/sweep-expired",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = SweepResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn sweep_expired(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    let expired = state
        .services
        .reservations
        .sweep_expired(claims.principal())
        .await?;
    Ok(Json(SweepResponse { expired }))
}
