//! Reservation queue service

use chrono::Utc;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        loan::Loan,
        reservation::{Reservation, ReservationDetails, ReservationStatus},
        user::Principal,
    },
    repository::Repository,
};

/// Staff action on a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationAction {
    Fulfill,
    Cancel,
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    config: CirculationConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    /// Reserve a book for the calling user. Only fully loaned-out books can
    /// be reserved.
    pub async fn reserve(&self, principal: Principal, book_id: i32) -> AppResult<Reservation> {
        let reservation = self
            .repository
            .reservations
            .create(principal.id, book_id, &self.config)
            .await?;

        tracing::info!(
            "User {} reserved book {} (reservation {}, queue position {})",
            principal.id,
            book_id,
            reservation.id,
            reservation.priority
        );
        Ok(reservation)
    }

    /// Cancel a reservation. Owner or staff only.
    pub async fn cancel(&self, principal: Principal, reservation_id: i32) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;
        principal.require_owner_or_staff(reservation.user_id)?;

        if !reservation.status.is_open() {
            return Err(AppError::Conflict(format!(
                "Reservation is {} and cannot be cancelled",
                reservation.status
            )));
        }

        self.repository.reservations.cancel(reservation_id).await
    }

    /// Staff-only fulfill or cancel
    pub async fn manage(
        &self,
        principal: Principal,
        reservation_id: i32,
        action: ReservationAction,
    ) -> AppResult<(Reservation, Option<Loan>)> {
        principal.require_staff()?;

        match action {
            ReservationAction::Fulfill => {
                let (reservation, loan) = self
                    .repository
                    .reservations
                    .fulfill(reservation_id, &self.config)
                    .await?;
                tracing::info!(
                    "Reservation {} fulfilled: book {} loaned to user {}",
                    reservation.id,
                    reservation.book_id,
                    reservation.user_id
                );
                Ok((reservation, Some(loan)))
            }
            ReservationAction::Cancel => {
                let current = self.repository.reservations.get_by_id(reservation_id).await?;
                if !current.status.is_open() {
                    return Err(AppError::Conflict(format!(
                        "Reservation is {} and cannot be cancelled",
                        current.status
                    )));
                }
                let reservation = self.repository.reservations.cancel(reservation_id).await?;
                Ok((reservation, None))
            }
        }
    }

    /// Transition expired open reservations to `expired` (staff-triggered)
    pub async fn sweep_expired(&self, principal: Principal) -> AppResult<u64> {
        principal.require_staff()?;

        let swept = self.repository.reservations.sweep_expired(Utc::now()).await?;
        if swept > 0 {
            tracing::info!("Marked {} reservations as expired", swept);
        }
        Ok(swept)
    }

    /// The caller's reservations
    pub async fn my_reservations(&self, principal: Principal) -> AppResult<Vec<ReservationDetails>> {
        self.repository
            .reservations
            .get_user_reservations(principal.id)
            .await
    }

    /// All reservations with optional status filter (staff view)
    pub async fn all_reservations(
        &self,
        principal: Principal,
        status: Option<&str>,
    ) -> AppResult<Vec<ReservationDetails>> {
        principal.require_staff()?;

        let status = status
            .map(|s| {
                s.parse::<ReservationStatus>()
                    .map_err(AppError::Validation)
            })
            .transpose()?;

        self.repository.reservations.list_all(status).await
    }
}
