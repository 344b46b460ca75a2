//! Reservations repository for database operations
//!
//! Priority assignment and fulfillment run in the same transaction as the
//! book row lock, so two simultaneous reservations of a book get distinct
//! queue positions and fulfillment can never oversell the last copy.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        loan::Loan,
        reservation::{Reservation, ReservationDetails, ReservationStatus},
    },
    repository::loans::{insert_active_loan, lock_book},
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Create a reservation at the back of the book's queue
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        config: &CirculationConfig,
    ) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let book = lock_book(&mut tx, book_id).await?;
        if book.available_copies > 0 {
            return Err(AppError::BookAvailable(format!(
                "\"{}\" has copies available; borrow it instead of reserving",
                book.title
            )));
        }

        let has_open_reservation: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND book_id = $2 AND status IN ('pending', 'available')
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let has_active_loan: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND returned_date IS NULL)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if has_open_reservation || has_active_loan {
            return Err(AppError::DuplicateReservation(format!(
                "User already has an active reservation or loan for \"{}\"",
                book.title
            )));
        }

        // FIFO position: one past the open reservations at this moment.
        let open_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE book_id = $1 AND status IN ('pending', 'available')",
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, book_id, reserved_date, expiry_date, status, priority, notified)
            VALUES ($1, $2, $3, $4, 'pending', $5, FALSE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(now + Duration::days(config.reservation_hold_days))
        .bind(open_count as i32 + 1)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if db.constraint() == Some("reservations_one_open_per_user_book") =>
            {
                AppError::DuplicateReservation(format!(
                    "User already has an active reservation for \"{}\"",
                    book.title
                ))
            }
            _ => AppError::Database(e),
        })?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Set a reservation's status to cancelled
    pub async fn cancel(&self, id: i32) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'cancelled' WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?;
        Ok(reservation)
    }

    /// Fulfill a reservation: loan the book to the reserving user and mark
    /// the reservation fulfilled, all in one transaction.
    pub async fn fulfill(
        &self,
        id: i32,
        config: &CirculationConfig,
    ) -> AppResult<(Reservation, Loan)> {
        let mut tx = self.pool.begin().await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?;

        if !reservation.status.is_open() {
            return Err(AppError::Conflict(format!(
                "Reservation is {} and cannot be fulfilled",
                reservation.status
            )));
        }

        let book = lock_book(&mut tx, reservation.book_id).await?;
        if book.available_copies <= 0 {
            return Err(AppError::Unavailable(format!(
                "\"{}\" has no copies available to fulfill the reservation",
                book.title
            )));
        }

        let loan = insert_active_loan(&mut tx, reservation.user_id, &book, config).await?;

        let fulfilled = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'fulfilled' WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((fulfilled, loan))
    }

    /// Promote the head of the book's queue to `available` when a copy comes
    /// back. Returns the promoted reservation, if any pending one exists.
    pub async fn promote_next(&self, book_id: i32) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET status = 'available', notified = TRUE
            WHERE id = (
                SELECT id FROM reservations
                WHERE book_id = $1 AND status = 'pending'
                ORDER BY priority, reserved_date
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    /// Mark expired open reservations. Expiry is otherwise a read-only
    /// predicate; this sweep is triggered by staff or a scheduler.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'expired'
            WHERE status IN ('pending', 'available') AND expiry_date < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get all reservations for a user, most recent first
    pub async fn get_user_reservations(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT r.*, u.username, b.title AS book_title
            FROM reservations r
            JOIN users u ON r.user_id = u.id
            JOIN books b ON r.book_id = b.id
            WHERE r.user_id = $1
            ORDER BY r.reserved_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|r| r.into_details(now)).collect())
    }

    /// List all reservations with optional status filter (staff view)
    pub async fn list_all(
        &self,
        status: Option<ReservationStatus>,
    ) -> AppResult<Vec<ReservationDetails>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ReservationRow>(
                    r#"
                    SELECT r.*, u.username, b.title AS book_title
                    FROM reservations r
                    JOIN users u ON r.user_id = u.id
                    JOIN books b ON r.book_id = b.id
                    WHERE r.status = $1
                    ORDER BY r.reserved_date DESC
                    "#,
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReservationRow>(
                    r#"
                    SELECT r.*, u.username, b.title AS book_title
                    FROM reservations r
                    JOIN users u ON r.user_id = u.id
                    JOIN books b ON r.book_id = b.id
                    ORDER BY r.reserved_date DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let now = Utc::now();
        Ok(rows.into_iter().map(|r| r.into_details(now)).collect())
    }

    /// Count reservations still waiting in a queue
    pub async fn count_pending(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

/// Internal row for reservation listings
#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i32,
    user_id: i32,
    book_id: i32,
    reserved_date: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    status: ReservationStatus,
    priority: i32,
    notified: bool,
    username: String,
    book_title: String,
}

impl ReservationRow {
    fn into_details(self, now: DateTime<Utc>) -> ReservationDetails {
        let reservation = Reservation {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            reserved_date: self.reserved_date,
            expiry_date: self.expiry_date,
            status: self.status,
            priority: self.priority,
            notified: self.notified,
        };
        ReservationDetails::from_reservation(reservation, self.username, self.book_title, now)
    }
}
