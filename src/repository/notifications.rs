//! Notifications repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::notification::{
        Notification, NotificationKind, NotificationPreferences, UpdatePreferences,
    },
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a notification for a user
    pub async fn insert(
        &self,
        user_id: i32,
        title: &str,
        message: &str,
        kind: NotificationKind,
        related_loan_id: Option<i32>,
        related_reservation_id: Option<i32>,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, kind,
                                       related_loan_id, related_reservation_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(kind)
        .bind(related_loan_id)
        .bind(related_reservation_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    /// Get a user's notifications, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Count a user's unread notifications
    pub async fn unread_count(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))
    }

    /// Mark all of the user's notifications as read
    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get the user's preferences, creating defaults on first access
    pub async fn get_or_create_preferences(
        &self,
        user_id: i32,
    ) -> AppResult<NotificationPreferences> {
        let preferences = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            INSERT INTO notification_preferences (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(preferences)
    }

    /// Update the user's email opt-in flags
    pub async fn update_preferences(
        &self,
        user_id: i32,
        update: &UpdatePreferences,
    ) -> AppResult<NotificationPreferences> {
        let current = self.get_or_create_preferences(user_id).await?;

        let preferences = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            UPDATE notification_preferences
            SET email_due_reminders = $1, email_overdue_alerts = $2,
                email_reservation_available = $3, email_general = $4
            WHERE user_id = $5
            RETURNING *
            "#,
        )
        .bind(update.email_due_reminders.unwrap_or(current.email_due_reminders))
        .bind(update.email_overdue_alerts.unwrap_or(current.email_overdue_alerts))
        .bind(
            update
                .email_reservation_available
                .unwrap_or(current.email_reservation_available),
        )
        .bind(update.email_general.unwrap_or(current.email_general))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(preferences)
    }
}
