//! Loan (borrow) model and related types
//!
//! Loan status is never stored. It is a pure function of `due_date`,
//! `returned_date` and the clock, recomputed on every read so that the
//! persisted row can never drift from reality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Derived loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        };
        write!(f, "{}", label)
    }
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub renewals: i32,
    pub max_renewals: i32,
}

impl Loan {
    /// Status derived from dates: returned wins, then overdue, then active.
    pub fn status_at(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.returned_date.is_some() {
            LoanStatus::Returned
        } else if now > self.due_date {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.returned_date.is_none() && now > self.due_date
    }

    /// Whole days past the due date, 0 when not overdue.
    pub fn days_overdue_at(&self, now: DateTime<Utc>) -> i64 {
        if self.is_overdue_at(now) {
            (now - self.due_date).num_days()
        } else {
            0
        }
    }

    /// A loan can be renewed while it is active, not overdue, and the
    /// renewal budget is not exhausted.
    pub fn can_renew_at(&self, now: DateTime<Utc>) -> bool {
        self.renewals < self.max_renewals && self.status_at(now) == LoanStatus::Active
    }
}

/// Loan with display details and derived fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub book_id: i32,
    pub book_title: String,
    pub borrowed_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub renewals: i32,
    pub max_renewals: i32,
    pub status: LoanStatus,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

impl LoanDetails {
    pub fn from_loan(loan: Loan, username: String, book_title: String, now: DateTime<Utc>) -> Self {
        Self {
            status: loan.status_at(now),
            is_overdue: loan.is_overdue_at(now),
            days_overdue: loan.days_overdue_at(now),
            id: loan.id,
            user_id: loan.user_id,
            username,
            book_id: loan.book_id,
            book_title,
            borrowed_date: loan.borrowed_date,
            due_date: loan.due_date,
            returned_date: loan.returned_date,
            renewals: loan.renewals,
            max_renewals: loan.max_renewals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(due_in_days: i64, returned: bool, renewals: i32) -> (Loan, DateTime<Utc>) {
        let now = Utc::now();
        let loan = Loan {
            id: 1,
            user_id: 1,
            book_id: 1,
            borrowed_date: now - Duration::days(14 - due_in_days),
            due_date: now + Duration::days(due_in_days),
            returned_date: returned.then_some(now),
            renewals,
            max_renewals: 2,
        };
        (loan, now)
    }

    #[test]
    fn status_is_active_before_due_date() {
        let (loan, now) = loan(3, false, 0);
        assert_eq!(loan.status_at(now), LoanStatus::Active);
        assert!(!loan.is_overdue_at(now));
        assert_eq!(loan.days_overdue_at(now), 0);
    }

    #[test]
    fn status_is_overdue_after_due_date() {
        let (loan, now) = loan(-5, false, 0);
        assert_eq!(loan.status_at(now), LoanStatus::Overdue);
        assert!(loan.is_overdue_at(now));
        assert_eq!(loan.days_overdue_at(now), 5);
    }

    #[test]
    fn returned_wins_over_overdue() {
        // Returning late must never leave the loan overdue.
        let (loan, now) = loan(-30, true, 0);
        assert_eq!(loan.status_at(now), LoanStatus::Returned);
        assert!(!loan.is_overdue_at(now));
        assert_eq!(loan.days_overdue_at(now), 0);
    }

    #[test]
    fn status_flips_exactly_at_due_date() {
        let (loan, _) = loan(0, false, 0);
        assert_eq!(loan.status_at(loan.due_date), LoanStatus::Active);
        assert_eq!(
            loan.status_at(loan.due_date + Duration::seconds(1)),
            LoanStatus::Overdue
        );
    }

    #[test]
    fn renewable_while_active_and_under_budget() {
        let (loan, now) = loan(3, false, 1);
        assert!(loan.can_renew_at(now));
    }

    #[test]
    fn renewal_denied_at_budget() {
        let (loan, now) = loan(3, false, 2);
        assert!(!loan.can_renew_at(now));
    }

    #[test]
    fn renewal_denied_when_overdue_or_returned() {
        let (overdue, now) = loan(-1, false, 0);
        assert!(!overdue.can_renew_at(now));

        let (returned, now) = loan(3, true, 0);
        assert!(!returned.can_renew_at(now));
    }
}
