//! Loan lifecycle service: borrowing, returning, renewing
//!
//! Ownership and role checks happen here, against the explicit Principal of
//! the caller; the repository below enforces the transactional invariants.

use chrono::Utc;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanDetails},
        user::Principal,
    },
    repository::{
        loans::{LoanCounts, LoanFilter},
        Repository,
    },
    services::notifications::NotificationsService,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    config: CirculationConfig,
    notifications: NotificationsService,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        config: CirculationConfig,
        notifications: NotificationsService,
    ) -> Self {
        Self {
            repository,
            config,
            notifications,
        }
    }

    /// Borrow a book for the calling user
    pub async fn borrow(&self, principal: Principal, book_id: i32) -> AppResult<Loan> {
        let loan = self
            .repository
            .loans
            .create(principal.id, book_id, &self.config)
            .await?;

        tracing::info!(
            "User {} borrowed book {} (loan {}, due {})",
            principal.id,
            book_id,
            loan.id,
            loan.due_date
        );
        Ok(loan)
    }

    /// Return a loan. The loan's owner or any staff member may return it;
    /// returning an already-returned loan is a no-op.
    pub async fn return_loan(&self, principal: Principal, loan_id: i32) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        principal.require_owner_or_staff(loan.user_id)?;

        let was_returned = loan.returned_date.is_some();
        let returned = self.repository.loans.return_loan(loan_id).await?;

        // A copy came back: hand it to the head of the reservation queue.
        if !was_returned {
            if let Some(reservation) = self
                .repository
                .reservations
                .promote_next(returned.book_id)
                .await?
            {
                // The return is already committed at this point. A failed
                // notification must not surface as a failed return.
                let notify = async {
                    let book = self.repository.books.get_by_id(returned.book_id).await?;
                    self.notifications
                        .notify_reservation_available(&reservation, &book.title)
                        .await
                };
                if let Err(err) = notify.await {
                    tracing::warn!(
                        reservation_id = reservation.id,
                        book_id = returned.book_id,
                        "failed to notify next reservation holder: {}",
                        err
                    );
                }
            }
        }

        Ok(returned)
    }

    /// Renew a loan, extending its due date. Only the borrower may renew.
    pub async fn renew(&self, principal: Principal, loan_id: i32) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.user_id != principal.id {
            return Err(AppError::NotFound("Loan not found".to_string()));
        }

        self.repository.loans.renew(loan_id, &self.config).await
    }

    /// The caller's loans, with active/overdue counts
    pub async fn my_loans(&self, principal: Principal) -> AppResult<(Vec<LoanDetails>, i64, i64)> {
        let loans = self.repository.loans.get_user_loans(principal.id).await?;

        let now = Utc::now();
        let active = loans.iter().filter(|l| l.returned_date.is_none()).count() as i64;
        let overdue = loans
            .iter()
            .filter(|l| l.returned_date.is_none() && l.due_date < now)
            .count() as i64;

        Ok((loans, active, overdue))
    }

    /// A specific user's loans (staff view)
    pub async fn user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.get_user_loans(user_id).await
    }

    /// All loans with filter and pagination, plus aggregate counts (staff view)
    pub async fn all_loans(
        &self,
        filter: LoanFilter,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<LoanDetails>, i64, LoanCounts)> {
        let (loans, total) = self.repository.loans.list_all(filter, page, per_page).await?;
        let counts = self.repository.loans.counts().await?;
        Ok((loans, total, counts))
    }
}
