//! Books repository for catalog database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{clamp_available_copies, Book, BookDetails, BookQuery, BookShort, CreateBook, UpdateBook},
        genre::{CreateGenre, Genre},
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book with author/genre names and the viewer's loan/reservation flags
    pub async fn get_details(&self, id: i32, viewer_id: Option<i32>) -> AppResult<BookDetails> {
        let book = self.get_by_id(id).await?;

        let author_name: String = sqlx::query_scalar(
            "SELECT first_name || ' ' || last_name FROM authors WHERE id = $1",
        )
        .bind(book.author_id)
        .fetch_one(&self.pool)
        .await?;

        let genre_name: Option<String> = match book.genre_id {
            Some(genre_id) => {
                sqlx::query_scalar("SELECT name FROM genres WHERE id = $1")
                    .bind(genre_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let (user_has_loan, user_has_reservation) = match viewer_id {
            Some(user_id) => {
                let has_loan: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM loans WHERE user_id = $1 AND book_id = $2 AND returned_date IS NULL)",
                )
                .bind(user_id)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

                let has_reservation: bool = sqlx::query_scalar(
                    r#"
                    SELECT EXISTS(
                        SELECT 1 FROM reservations
                        WHERE user_id = $1 AND book_id = $2 AND status IN ('pending', 'available')
                    )
                    "#,
                )
                .bind(user_id)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

                (has_loan, has_reservation)
            }
            None => (false, false),
        };

        Ok(BookDetails {
            is_available: book.is_available(),
            book,
            author_name,
            genre_name,
            user_has_loan,
            user_has_reservation,
        })
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT b.id, b.title, a.first_name || ' ' || a.last_name AS author_name,
                   b.isbn, g.name AS genre_name, b.publication_year,
                   b.total_copies, b.available_copies
            FROM books b
            JOIN authors a ON b.author_id = a.id
            LEFT JOIN genres g ON b.genre_id = g.id
            WHERE TRUE
            "#,
        );
        let mut count_builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*)
            FROM books b
            JOIN authors a ON b.author_id = a.id
            WHERE TRUE
            "#,
        );

        if let Some(ref text) = query.query {
            let pattern = format!("%{}%", text);
            builder
                .push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.isbn ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.publisher ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.description ILIKE ")
                .push_bind(pattern.clone())
                .push(")");
            count_builder
                .push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.isbn ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.publisher ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(genre_id) = query.genre_id {
            builder.push(" AND b.genre_id = ").push_bind(genre_id);
            count_builder.push(" AND b.genre_id = ").push_bind(genre_id);
        }
        if let Some(author_id) = query.author_id {
            builder.push(" AND b.author_id = ").push_bind(author_id);
            count_builder.push(" AND b.author_id = ").push_bind(author_id);
        }
        if let Some(year) = query.publication_year {
            builder.push(" AND b.publication_year = ").push_bind(year);
            count_builder.push(" AND b.publication_year = ").push_bind(year);
        }
        if query.available_only.unwrap_or(false) {
            builder.push(" AND b.available_copies > 0");
            count_builder.push(" AND b.available_copies > 0");
        }

        let total: i64 = count_builder.build_query_scalar().fetch_one(&self.pool).await?;

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(12).clamp(1, 100);
        builder
            .push(" ORDER BY b.title LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);

        let books = builder
            .build_query_as::<BookShort>()
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// Create a new book. New books start with all copies on the shelf.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, isbn, genre_id, publication_year,
                               publisher, description, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(book.author_id)
        .bind(&book.isbn)
        .bind(book.genre_id)
        .bind(book.publication_year)
        .bind(&book.publisher)
        .bind(&book.description)
        .bind(book.total_copies.max(0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("books_isbn_key") => {
                AppError::Conflict(format!("A book with ISBN {} already exists", book.isbn))
            }
            _ => AppError::Database(e),
        })?;
        Ok(created)
    }

    /// Update a book; the available-copies counter is clamped into
    /// [0, total_copies] whatever the caller sends.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let current = self.get_by_id(id).await?;

        let total_copies = update.total_copies.unwrap_or(current.total_copies).max(0);
        let available_copies = clamp_available_copies(
            update.available_copies.unwrap_or(current.available_copies),
            total_copies,
        );

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, genre_id = $3, publication_year = $4,
                publisher = $5, description = $6, total_copies = $7,
                available_copies = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(update.title.as_ref().unwrap_or(&current.title))
        .bind(update.author_id.unwrap_or(current.author_id))
        .bind(update.genre_id.or(current.genre_id))
        .bind(update.publication_year.unwrap_or(current.publication_year))
        .bind(update.publisher.as_ref().unwrap_or(&current.publisher))
        .bind(update.description.as_ref().unwrap_or(&current.description))
        .bind(total_copies)
        .bind(available_copies)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Sum of total and available copies across the catalog
    pub async fn copy_totals(&self) -> AppResult<(i64, i64)> {
        let row: (Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT SUM(total_copies)::bigint, SUM(available_copies)::bigint FROM books",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.0.unwrap_or(0), row.1.unwrap_or(0)))
    }

    /// Count books in the catalog
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // --- Genres ---

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT * FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    pub async fn create_genre(&self, genre: &CreateGenre) -> AppResult<Genre> {
        let created = sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&genre.name)
        .bind(&genre.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("genres_name_key") => {
                AppError::Conflict(format!("Genre \"{}\" already exists", genre.name))
            }
            _ => AppError::Database(e),
        })?;
        Ok(created)
    }

    // --- Authors ---

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let authors =
            sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY last_name, first_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(authors)
    }

    pub async fn create_author(&self, author: &CreateAuthor) -> AppResult<Author> {
        let created = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name, bio, date_of_birth, date_of_death)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(&author.bio)
        .bind(author.date_of_birth)
        .bind(author.date_of_death)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}
