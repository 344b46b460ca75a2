//! Notification dispatch service
//!
//! Creates in-app notification rows and sends the matching email when the
//! user's preferences allow it. Email failures are logged and swallowed;
//! the in-app notification is the system of record.

use chrono::Utc;

use crate::{
    error::AppResult,
    models::notification::{
        Notification, NotificationKind, NotificationPreferences, UpdatePreferences,
    },
    models::reservation::Reservation,
    repository::Repository,
    services::email::EmailService,
};

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
    email: EmailService,
}

impl NotificationsService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Notification>> {
        self.repository.notifications.list_for_user(user_id).await
    }

    pub async fn unread_count(&self, user_id: i32) -> AppResult<i64> {
        self.repository.notifications.unread_count(user_id).await
    }

    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<Notification> {
        self.repository.notifications.mark_read(id, user_id).await
    }

    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        self.repository.notifications.mark_all_read(user_id).await
    }

    pub async fn get_preferences(&self, user_id: i32) -> AppResult<NotificationPreferences> {
        self.repository
            .notifications
            .get_or_create_preferences(user_id)
            .await
    }

    pub async fn update_preferences(
        &self,
        user_id: i32,
        update: UpdatePreferences,
    ) -> AppResult<NotificationPreferences> {
        self.repository
            .notifications
            .update_preferences(user_id, &update)
            .await
    }

    /// Create a due-tomorrow reminder for every unreturned loan due within
    /// the next day. Returns the number of reminders created.
    pub async fn dispatch_due_reminders(&self) -> AppResult<u64> {
        let now = Utc::now();
        let loans = self.repository.loans.due_soon(now).await?;

        let mut count = 0;
        for loan in &loans {
            self.repository
                .notifications
                .insert(
                    loan.user_id,
                    "Due Date Reminder",
                    &format!(
                        "Your book \"{}\" is due tomorrow. Please return it on time.",
                        loan.book_title
                    ),
                    NotificationKind::DueReminder,
                    Some(loan.id),
                    None,
                )
                .await?;

            self.send_email_if_allowed(
                loan.user_id,
                &loan.email,
                NotificationKind::DueReminder,
                "Library Book Due Tomorrow",
                &format!(
                    "Dear {},\n\n\
                     This is a reminder that your book \"{}\" is due tomorrow ({}).\n\n\
                     Please return it to the library to avoid late fees.\n\n\
                     Best regards,\nAthenaeum Library",
                    loan.first_name,
                    loan.book_title,
                    loan.due_date.format("%B %d, %Y"),
                ),
            )
            .await?;
            count += 1;
        }

        tracing::info!("Dispatched {} due date reminders", count);
        Ok(count)
    }

    /// Create an overdue alert for every unreturned loan past its due date.
    pub async fn dispatch_overdue_alerts(&self) -> AppResult<u64> {
        let now = Utc::now();
        let loans = self.repository.loans.overdue(now).await?;

        let mut count = 0;
        for loan in &loans {
            let days_overdue = (now - loan.due_date).num_days();

            self.repository
                .notifications
                .insert(
                    loan.user_id,
                    "Overdue Book Alert",
                    &format!(
                        "Your book \"{}\" is {} days overdue.",
                        loan.book_title, days_overdue
                    ),
                    NotificationKind::OverdueAlert,
                    Some(loan.id),
                    None,
                )
                .await?;

            self.send_email_if_allowed(
                loan.user_id,
                &loan.email,
                NotificationKind::OverdueAlert,
                "Overdue Book Alert",
                &format!(
                    "Dear {},\n\n\
                     Your book \"{}\" is {} days overdue.\n\n\
                     Please return it as soon as possible to avoid additional fees.\n\n\
                     Best regards,\nAthenaeum Library",
                    loan.first_name, loan.book_title, days_overdue,
                ),
            )
            .await?;
            count += 1;
        }

        tracing::info!("Dispatched {} overdue alerts", count);
        Ok(count)
    }

    /// Tell the holder of a promoted reservation their book is waiting
    pub async fn notify_reservation_available(
        &self,
        reservation: &Reservation,
        book_title: &str,
    ) -> AppResult<()> {
        self.repository
            .notifications
            .insert(
                reservation.user_id,
                "Reserved Book Available",
                &format!(
                    "\"{}\" is now available. Your hold expires on {}.",
                    book_title,
                    reservation.expiry_date.format("%B %d, %Y"),
                ),
                NotificationKind::ReservationAvailable,
                None,
                Some(reservation.id),
            )
            .await?;

        let user = self.repository.users.get_by_id(reservation.user_id).await?;
        self.send_email_if_allowed(
            reservation.user_id,
            &user.email,
            NotificationKind::ReservationAvailable,
            "Reserved Book Available",
            &format!(
                "Dear {},\n\n\
                 The book \"{}\" you reserved is now available for pickup.\n\n\
                 Please collect it before {}.\n\n\
                 Best regards,\nAthenaeum Library",
                user.first_name,
                book_title,
                reservation.expiry_date.format("%B %d, %Y"),
            ),
        )
        .await
    }

    /// Email delivery honors per-user opt-in and never fails the caller.
    async fn send_email_if_allowed(
        &self,
        user_id: i32,
        to: &str,
        kind: NotificationKind,
        subject: &str,
        body: &str,
    ) -> AppResult<()> {
        let preferences = self
            .repository
            .notifications
            .get_or_create_preferences(user_id)
            .await?;

        if !preferences.allows_email(kind) {
            return Ok(());
        }

        if let Err(e) = self.email.send(to, subject, body).await {
            tracing::warn!("Failed to send {} email to {}: {}", kind, to, e);
        }
        Ok(())
    }
}
