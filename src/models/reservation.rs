//! Reservation model and queue types
//!
//! Reservations form a per-book FIFO queue: the priority column is the
//! position assigned at creation (1 + number of open reservations for the
//! book at that moment).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Queued, waiting for a copy
    Pending,
    /// A copy is being held for the user
    Available,
    /// Converted into a loan
    Fulfilled,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Available => "available",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Expired => "expired",
        }
    }

    /// Open reservations occupy a queue slot and block duplicates.
    pub fn is_open(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Available)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "available" => Ok(ReservationStatus::Available),
            "fulfilled" => Ok(ReservationStatus::Fulfilled),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "expired" => Ok(ReservationStatus::Expired),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

// SQLx conversion for ReservationStatus (stored as VARCHAR)
impl sqlx::Type<Postgres> for ReservationStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ReservationStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ReservationStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    /// FIFO position among open reservations for the book at creation time
    pub priority: i32,
    pub notified: bool,
}

impl Reservation {
    /// Expiry is a read-only predicate; rows are only transitioned to
    /// `expired` by the staff-triggered sweep.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }
}

/// Reservation with display details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub book_id: i32,
    pub book_title: String,
    pub reserved_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub priority: i32,
    pub notified: bool,
    pub is_expired: bool,
}

impl ReservationDetails {
    pub fn from_reservation(
        reservation: Reservation,
        username: String,
        book_title: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            is_expired: reservation.is_expired_at(now),
            id: reservation.id,
            user_id: reservation.user_id,
            username,
            book_id: reservation.book_id,
            book_title,
            reserved_date: reservation.reserved_date,
            expiry_date: reservation.expiry_date,
            status: reservation.status,
            priority: reservation.priority,
            notified: reservation.notified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Available,
            ReservationStatus::Fulfilled,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_pending_and_available_are_open() {
        assert!(ReservationStatus::Pending.is_open());
        assert!(ReservationStatus::Available.is_open());
        assert!(!ReservationStatus::Fulfilled.is_open());
        assert!(!ReservationStatus::Cancelled.is_open());
        assert!(!ReservationStatus::Expired.is_open());
    }

    #[test]
    fn expiry_predicate() {
        let now = Utc::now();
        let reservation = Reservation {
            id: 1,
            user_id: 1,
            book_id: 1,
            reserved_date: now - Duration::days(3),
            expiry_date: now + Duration::hours(1),
            status: ReservationStatus::Pending,
            priority: 1,
            notified: false,
        };
        assert!(!reservation.is_expired_at(now));
        assert!(reservation.is_expired_at(now + Duration::hours(2)));
    }
}
