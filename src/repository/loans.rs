//! Loans repository for database operations
//!
//! Borrow and return mutate the book's copy counter and the loan row inside
//! a single transaction, with a `FOR UPDATE` lock on the book taken before
//! the counter is read. Concurrent borrows of the last copy therefore
//! serialize instead of both decrementing; the partial unique index on
//! active (user, book) pairs backstops the duplicate-loan fast path.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        book::Book,
        loan::{Loan, LoanDetails, LoanStatus},
    },
};

/// Loan joined with borrower contact and book title, for notification runs
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotifiableLoan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub due_date: DateTime<Utc>,
    pub first_name: String,
    pub email: String,
    pub book_title: String,
}

/// Status filter for staff loan listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanFilter {
    All,
    Active,
    Overdue,
    Returned,
}

/// Aggregate counts for the staff loan listing
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct LoanCounts {
    pub total: i64,
    pub active: i64,
    pub overdue: i64,
    pub returned: i64,
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Create a new loan (borrow a book)
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        config: &CirculationConfig,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let book = lock_book(&mut tx, book_id).await?;
        if book.available_copies <= 0 {
            return Err(AppError::Unavailable(format!(
                "\"{}\" has no copies available for borrowing",
                book.title
            )));
        }

        let loan = insert_active_loan(&mut tx, user_id, &book, config).await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Return a loan. Already-returned loans are a no-op.
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.returned_date.is_some() {
            return Ok(loan);
        }

        lock_book(&mut tx, loan.book_id).await?;

        let returned = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET returned_date = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Utc::now())
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        // Increment bounded by total_copies.
        sqlx::query(
            r#"
            UPDATE books
            SET available_copies = LEAST(available_copies + 1, total_copies),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(returned)
    }

    /// Renew a loan, extending the due date. Fails without mutation when the
    /// renewal budget is spent or the loan is overdue or returned.
    pub async fn renew(&self, loan_id: i32, config: &CirculationConfig) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        let now = Utc::now();
        if !loan.can_renew_at(now) {
            return Err(AppError::RenewalDenied(match loan.status_at(now) {
                LoanStatus::Returned => "Loan has already been returned".to_string(),
                LoanStatus::Overdue => "Overdue loans cannot be renewed".to_string(),
                LoanStatus::Active => format!(
                    "Maximum renewals reached ({}/{})",
                    loan.renewals, loan.max_renewals
                ),
            }));
        }

        let renewed = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET renewals = renewals + 1, due_date = $1 WHERE id = $2 RETURNING *",
        )
        .bind(now + Duration::days(config.loan_period_days))
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(renewed)
    }

    /// Get all loans for a user, most recent first
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            r#"
            SELECT l.*, u.username, b.title AS book_title
            FROM loans l
            JOIN users u ON l.user_id = u.id
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1
            ORDER BY l.borrowed_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|r| r.into_details(now)).collect())
    }

    /// List all loans with status filter and pagination (staff view)
    pub async fn list_all(
        &self,
        filter: LoanFilter,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let predicate = match filter {
            LoanFilter::All => "TRUE",
            LoanFilter::Active => "l.returned_date IS NULL AND l.due_date >= NOW()",
            LoanFilter::Overdue => "l.returned_date IS NULL AND l.due_date < NOW()",
            LoanFilter::Returned => "l.returned_date IS NOT NULL",
        };

        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM loans l WHERE {}",
            predicate
        ))
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            r#"
            SELECT l.*, u.username, b.title AS book_title
            FROM loans l
            JOIN users u ON l.user_id = u.id
            JOIN books b ON l.book_id = b.id
            WHERE {}
            ORDER BY l.borrowed_date DESC
            LIMIT $1 OFFSET $2
            "#,
            predicate
        ))
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok((rows.into_iter().map(|r| r.into_details(now)).collect(), total))
    }

    /// Aggregate counts for the staff loan listing
    pub async fn counts(&self) -> AppResult<LoanCounts> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE returned_date IS NULL AND due_date >= NOW()),
                   COUNT(*) FILTER (WHERE returned_date IS NULL AND due_date < NOW()),
                   COUNT(*) FILTER (WHERE returned_date IS NOT NULL)
            FROM loans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LoanCounts {
            total: row.0,
            active: row.1,
            overdue: row.2,
            returned: row.3,
        })
    }

    /// Count unreturned loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE returned_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count unreturned loans past their due date
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE returned_date IS NULL AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Unreturned loans due within the next day, for reminder dispatch
    pub async fn due_soon(&self, now: DateTime<Utc>) -> AppResult<Vec<NotifiableLoan>> {
        let loans = sqlx::query_as::<_, NotifiableLoan>(
            r#"
            SELECT l.id, l.user_id, l.book_id, l.due_date,
                   u.first_name, u.email, b.title AS book_title
            FROM loans l
            JOIN users u ON l.user_id = u.id
            JOIN books b ON l.book_id = b.id
            WHERE l.returned_date IS NULL
              AND l.due_date > $1
              AND l.due_date <= $2
            "#,
        )
        .bind(now)
        .bind(now + Duration::days(1))
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Unreturned loans past their due date, for overdue alert dispatch
    pub async fn overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<NotifiableLoan>> {
        let loans = sqlx::query_as::<_, NotifiableLoan>(
            r#"
            SELECT l.id, l.user_id, l.book_id, l.due_date,
                   u.first_name, u.email, b.title AS book_title
            FROM loans l
            JOIN users u ON l.user_id = u.id
            JOIN books b ON l.book_id = b.id
            WHERE l.returned_date IS NULL AND l.due_date < $1
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }
}

/// Lock a book row for the duration of the transaction
pub(crate) async fn lock_book(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
) -> AppResult<Book> {
    sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
}

/// Insert an unreturned loan for a user and decrement the book's counter.
/// Caller must already hold the book row lock and have verified
/// availability. Shared by borrow and reservation fulfillment.
pub(crate) async fn insert_active_loan(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i32,
    book: &Book,
    config: &CirculationConfig,
) -> AppResult<Loan> {
    let already_borrowed: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND returned_date IS NULL)",
    )
    .bind(user_id)
    .bind(book.id)
    .fetch_one(&mut **tx)
    .await?;

    if already_borrowed {
        return Err(AppError::DuplicateLoan(format!(
            "User already has \"{}\" on loan",
            book.title
        )));
    }

    let active_loans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND returned_date IS NULL",
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    if active_loans >= config.max_active_loans {
        return Err(AppError::LoanLimitExceeded(format!(
            "Maximum active loans reached ({}/{})",
            active_loans, config.max_active_loans
        )));
    }

    let now = Utc::now();
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        INSERT INTO loans (user_id, book_id, borrowed_date, due_date, renewals, max_renewals)
        VALUES ($1, $2, $3, $4, 0, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(book.id)
    .bind(now)
    .bind(now + Duration::days(config.loan_period_days))
    .bind(config.max_renewals)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| match &e {
        // Unique index is the backstop for concurrent duplicate borrows.
        sqlx::Error::Database(db) if db.constraint() == Some("loans_one_active_per_user_book") => {
            AppError::DuplicateLoan(format!("User already has \"{}\" on loan", book.title))
        }
        _ => AppError::Database(e),
    })?;

    sqlx::query(
        r#"
        UPDATE books
        SET available_copies = GREATEST(available_copies - 1, 0),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(book.id)
    .execute(&mut **tx)
    .await?;

    Ok(loan)
}

/// Internal row for loan listings
#[derive(sqlx::FromRow)]
struct LoanRow {
    id: i32,
    user_id: i32,
    book_id: i32,
    borrowed_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    returned_date: Option<DateTime<Utc>>,
    renewals: i32,
    max_renewals: i32,
    username: String,
    book_title: String,
}

impl LoanRow {
    fn into_details(self, now: DateTime<Utc>) -> LoanDetails {
        let loan = Loan {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            borrowed_date: self.borrowed_date,
            due_date: self.due_date,
            returned_date: self.returned_date,
            renewals: self.renewals,
            max_renewals: self.max_renewals,
        };
        LoanDetails::from_loan(loan, self.username, self.book_title, now)
    }
}
