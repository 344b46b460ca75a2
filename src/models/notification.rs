//! Notification model and dispatch kinds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Kinds of notification events produced by the lifecycle engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DueReminder,
    OverdueAlert,
    ReservationAvailable,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DueReminder => "due_reminder",
            NotificationKind::OverdueAlert => "overdue_alert",
            NotificationKind::ReservationAvailable => "reservation_available",
            NotificationKind::General => "general",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "due_reminder" => Ok(NotificationKind::DueReminder),
            "overdue_alert" => Ok(NotificationKind::OverdueAlert),
            "reservation_available" => Ok(NotificationKind::ReservationAvailable),
            "general" => Ok(NotificationKind::General),
            _ => Err(format!("Invalid notification kind: {}", s)),
        }
    }
}

// SQLx conversion for NotificationKind (stored as VARCHAR)
impl sqlx::Type<Postgres> for NotificationKind {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for NotificationKind {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for NotificationKind {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Notification model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub related_loan_id: Option<i32>,
    pub related_reservation_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Per-user email opt-in flags
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NotificationPreferences {
    pub user_id: i32,
    pub email_due_reminders: bool,
    pub email_overdue_alerts: bool,
    pub email_reservation_available: bool,
    pub email_general: bool,
}

impl NotificationPreferences {
    pub fn defaults_for(user_id: i32) -> Self {
        Self {
            user_id,
            email_due_reminders: true,
            email_overdue_alerts: true,
            email_reservation_available: true,
            email_general: true,
        }
    }

    /// Whether the user accepts email for the given kind
    pub fn allows_email(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::DueReminder => self.email_due_reminders,
            NotificationKind::OverdueAlert => self.email_overdue_alerts,
            NotificationKind::ReservationAvailable => self.email_reservation_available,
            NotificationKind::General => self.email_general,
        }
    }
}

/// Update preferences request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePreferences {
    pub email_due_reminders: Option<bool>,
    pub email_overdue_alerts: Option<bool>,
    pub email_reservation_available: Option<bool>,
    pub email_general: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            NotificationKind::DueReminder,
            NotificationKind::OverdueAlert,
            NotificationKind::ReservationAvailable,
            NotificationKind::General,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn preferences_gate_by_kind() {
        let mut prefs = NotificationPreferences::defaults_for(1);
        assert!(prefs.allows_email(NotificationKind::DueReminder));
        prefs.email_due_reminders = false;
        assert!(!prefs.allows_email(NotificationKind::DueReminder));
        assert!(prefs.allows_email(NotificationKind::OverdueAlert));
    }
}
