//! Statistics service

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::{AppError, AppResult};
use crate::repository::Repository;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardStats {
    pub total_books: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub total_users: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub pending_reservations: i64,
    pub loans_last_week: i64,
    pub returns_last_week: i64,
    /// Share of copies currently on loan, in percent.
    pub utilization_rate: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PopularBook {
    pub book_id: i32,
    pub title: String,
    pub author_name: String,
    pub loan_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    All,
    Year,
    Month,
    Week,
}

impl StatsPeriod {
    fn since(self) -> Option<chrono::DateTime<Utc>> {
        let now = Utc::now();
        match self {
            StatsPeriod::All => None,
            StatsPeriod::Year => Some(now - Duration::days(365)),
            StatsPeriod::Month => Some(now - Duration::days(30)),
            StatsPeriod::Week => Some(now - Duration::days(7)),
        }
    }
}

impl std::str::FromStr for StatsPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatsPeriod::All),
            "year" => Ok(StatsPeriod::Year),
            "month" => Ok(StatsPeriod::Month),
            "week" => Ok(StatsPeriod::Week),
            other => Err(AppError::Validation(format!(
                "unknown stats period: {other}"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Connection pool, exposed for liveness probes
    pub fn pool(&self) -> sqlx::PgPool {
        self.repository.pool.clone()
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let now = Utc::now();
        let week_ago = now - Duration::days(7);

        let total_books = self.repository.books.count().await?;
        let (total_copies, available_copies) = self.repository.books.copy_totals().await?;
        let total_users = self.repository.users.count().await?;
        let active_loans = self.repository.loans.count_active().await?;
        let overdue_loans = self.repository.loans.count_overdue().await?;
        let pending_reservations = self.repository.reservations.count_pending().await?;

        let pool = &self.repository.pool;
        let loans_last_week: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE borrowed_date >= $1")
                .bind(week_ago)
                .fetch_one(pool)
                .await?;
        let returns_last_week: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE returned_date >= $1")
                .bind(week_ago)
                .fetch_one(pool)
                .await?;

        let utilization_rate = if total_copies > 0 {
            let on_loan = total_copies - available_copies;
            (on_loan as f64 / total_copies as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Ok(DashboardStats {
            total_books,
            total_copies,
            available_copies,
            total_users,
            active_loans,
            overdue_loans,
            pending_reservations,
            loans_last_week,
            returns_last_week,
            utilization_rate,
        })
    }

    pub async fn popular_books(
        &self,
        period: StatsPeriod,
        limit: i64,
    ) -> AppResult<Vec<PopularBook>> {
        let limit = limit.clamp(1, 50);
        let pool = &self.repository.pool;

        let rows = match period.since() {
            Some(since) => {
                sqlx::query(
                    r#"SELECT b.id, b.title, a.first_name || ' ' || a.last_name AS author_name, COUNT(l.id) AS loan_count
                       FROM loans l
                       JOIN books b ON b.id = l.book_id
                       JOIN authors a ON a.id = b.author_id
                       WHERE l.borrowed_date >= $1
                       GROUP BY b.id, b.title, a.first_name, a.last_name
                       ORDER BY loan_count DESC, b.title
                       LIMIT $2"#,
                )
                .bind(since)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"SELECT b.id, b.title, a.first_name || ' ' || a.last_name AS author_name, COUNT(l.id) AS loan_count
                       FROM loans l
                       JOIN books b ON b.id = l.book_id
                       JOIN authors a ON a.id = b.author_id
                       GROUP BY b.id, b.title, a.first_name, a.last_name
                       ORDER BY loan_count DESC, b.title
                       LIMIT $1"#,
                )
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|row| PopularBook {
                book_id: row.get("id"),
                title: row.get("title"),
                author_name: row.get("author_name"),
                loan_count: row.get("loan_count"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_period_parses() {
        assert_eq!("week".parse::<StatsPeriod>().unwrap(), StatsPeriod::Week);
        assert_eq!("all".parse::<StatsPeriod>().unwrap(), StatsPeriod::All);
        assert!("decade".parse::<StatsPeriod>().is_err());
    }

    #[test]
    fn period_bounds() {
        assert!(StatsPeriod::All.since().is_none());
        let since = StatsPeriod::Week.since().unwrap();
        assert!(since < Utc::now());
    }
}
