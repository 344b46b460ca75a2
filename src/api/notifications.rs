//! Notification endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::notification::{Notification, NotificationPreferences, UpdatePreferences},
};

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

/// Result of a notification dispatch job
#[derive(Serialize, ToSchema)]
pub struct DispatchResponse {
    /// Number of notifications created
    pub dispatched: u64,
}

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's notifications", body = Vec<Notification>)
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .services
        .notifications
        .list_for_user(claims.user_id)
        .await?;
    Ok(Json(notifications))
}

/// Count the caller's unread notifications
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse)
    )
)]
pub async fn unread_count(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread = state
        .services
        .notifications
        .unread_count(claims.user_id)
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Mark one notification as read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Notification>> {
    let notification = state
        .services
        .notifications
        .mark_read(id, claims.user_id)
        .await?;
    Ok(Json(notification))
}

/// Mark all of the caller's notifications as read
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications marked read", body = DispatchResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DispatchResponse>> {
    let dispatched = state
        .services
        .notifications
        .mark_all_read(claims.user_id)
        .await?;
    Ok(Json(DispatchResponse { dispatched }))
}

/// Get the caller's notification preferences
#[utoipa::path(
    get,
    path = "/notifications/preferences",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notification preferences", body = NotificationPreferences)
    )
)]
pub async fn get_preferences(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<NotificationPreferences>> {
    let preferences = state
        .services
        .notifications
        .get_preferences(claims.user_id)
        .await?;
    Ok(Json(preferences))
}

/// Update the caller's notification preferences
#[utoipa::path(
    put,
    path = "/notifications/preferences",
    tag = "notifications",
    security(("bearer_auth" = [])),
    request_body = UpdatePreferences,
    responses(
        (status = 200, description = "Preferences updated", body = NotificationPreferences)
    )
)]
pub async fn update_preferences(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(update): Json<UpdatePreferences>,
) -> AppResult<Json<NotificationPreferences>> {
    let preferences = state
        .services
        .notifications
        .update_preferences(claims.user_id, update)
        .await?;
    Ok(Json(preferences))
}

/// Create due-tomorrow reminders for unreturned loans (staff)
#[utoipa::path(
    post,
    path = "/notifications/jobs/due-reminders",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reminders dispatched", body = DispatchResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn dispatch_due_reminders(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DispatchResponse>> {
    claims.require_staff()?;

    let dispatched = state.services.notifications.dispatch_due_reminders().await?;
    Ok(Json(DispatchResponse { dispatched }))
}

/// Create overdue alerts for loans past their due date (staff)
#[utoipa::path(
    post,
    path = "/notifications/jobs/overdue-alerts",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Alerts dispatched", body = DispatchResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn dispatch_overdue_alerts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DispatchResponse>> {
    claims.require_staff()?;

    let dispatched = state
        .services
        .notifications
        .dispatch_overdue_alerts()
        .await?;
    Ok(Json(DispatchResponse { dispatched }))
}
