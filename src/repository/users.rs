//! Users repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserQuery, UserRole, UserShort},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Insert a new user (password already hashed, membership id generated)
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: UserRole,
        phone_number: &str,
        address: &str,
        date_of_birth: Option<chrono::NaiveDate>,
        membership_id: &str,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, email, first_name, last_name,
                               role, phone_number, address, date_of_birth, membership_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(role)
        .bind(phone_number)
        .bind(address)
        .bind(date_of_birth)
        .bind(membership_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("users_username_key") => {
                AppError::Conflict(format!("Username \"{}\" already exists", username))
            }
            _ => AppError::Database(e),
        })?;
        Ok(user)
    }

    /// Update user fields, keeping current values where the update is silent
    pub async fn update(&self, id: i32, update: &crate::models::user::UpdateUser) -> AppResult<User> {
        let current = self.get_by_id(id).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $1, first_name = $2, last_name = $3, role = $4,
                phone_number = $5, address = $6, date_of_birth = $7,
                is_active = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(update.email.as_ref().unwrap_or(&current.email))
        .bind(update.first_name.as_ref().unwrap_or(&current.first_name))
        .bind(update.last_name.as_ref().unwrap_or(&current.last_name))
        .bind(update.role.unwrap_or(current.role))
        .bind(update.phone_number.as_ref().unwrap_or(&current.phone_number))
        .bind(update.address.as_ref().unwrap_or(&current.address))
        .bind(update.date_of_birth.or(current.date_of_birth))
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Delete a user
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Search users by name/role with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, username, first_name, last_name, role, membership_id, is_active \
             FROM users WHERE TRUE",
        );
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");

        if let Some(ref name) = query.name {
            let pattern = format!("%{}%", name);
            builder
                .push(" AND (username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(")");
            count_builder
                .push(" AND (username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(ref role) = query.role {
            builder.push(" AND role = ").push_bind(role.clone());
            count_builder.push(" AND role = ").push_bind(role.clone());
        }

        let total: i64 = count_builder.build_query_scalar().fetch_one(&self.pool).await?;

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        builder
            .push(" ORDER BY username LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);

        let users = builder
            .build_query_as::<UserShort>()
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    /// Count all users
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
