//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilters, StatusTransition},
};

/// Status as stored, with NULL and empty read as available
const STATUS_EXPR: &str = "COALESCE(NULLIF(status, ''), 'available')";

/// Column list matching `Book`, with nullable text columns flattened to ''.
///
/// Timestamps are cast to TIMESTAMPTZ so tables created with plain
/// TIMESTAMP columns decode as well.
fn book_columns() -> String {
    format!(
        r#"id, title, author,
           COALESCE(genre, '') AS genre,
           COALESCE(description, '') AS description,
           {STATUS_EXPR} AS status,
           COALESCE(lent_to, '') AS lent_to,
           lent_date::timestamptz AS lent_date,
           room, cabinet, shelf, "row",
           created_at::timestamptz AS created_at"#
    )
}

const CREATE_TABLES: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS books (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        genre TEXT,
        room TEXT NOT NULL DEFAULT 'Гостиная',
        cabinet INTEGER NOT NULL DEFAULT 1,
        shelf INTEGER NOT NULL DEFAULT 1,
        "row" INTEGER NOT NULL DEFAULT 1,
        description TEXT,
        status TEXT,
        lent_to TEXT,
        lent_date TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_books_full_location ON books (room, cabinet, shelf, "row")"#,
    "CREATE INDEX IF NOT EXISTS idx_books_room ON books (room)",
    "CREATE INDEX IF NOT EXISTS idx_books_author ON books (author)",
];

/// Wrap a term for ILIKE so that it matches as a literal substring
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Build the SELECT for a filtered listing; all values are bound parameters.
fn filtered_query(filters: &BookFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM books WHERE 1=1", book_columns()));

    if let Some(ref title) = filters.title {
        qb.push(" AND title ILIKE ").push_bind(like_pattern(title));
    }
    if let Some(ref author) = filters.author {
        qb.push(" AND author ILIKE ").push_bind(like_pattern(author));
    }
    if let Some(ref genre) = filters.genre {
        qb.push(" AND genre ILIKE ").push_bind(like_pattern(genre));
    }
    if let Some(ref status) = filters.status {
        qb.push(format!(" AND {STATUS_EXPR} = "))
            .push_bind(status.clone());
    }

    qb.push(" ORDER BY id");

    if filters.limit > 0 {
        qb.push(" LIMIT ").push_bind(filters.limit);
        if filters.offset > 0 {
            qb.push(" OFFSET ").push_bind(filters.offset);
        }
    }

    qb
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create the books table and its indexes if they do not exist yet
    pub async fn create_tables(&self) -> AppResult<()> {
        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Books table ready");
        Ok(())
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create(&self, book: &Book) -> AppResult<Book> {
        let query = format!(
            r#"
            INSERT INTO books (
                title, author, genre, description, status,
                lent_to, lent_date, room, cabinet, shelf, "row", created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                COALESCE($12, CURRENT_TIMESTAMP)
            )
            RETURNING {}
            "#,
            book_columns()
        );

        let created = sqlx::query_as::<_, Book>(&query)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.genre)
            .bind(&book.description)
            .bind(book.status.as_str())
            .bind(&book.lent_to)
            .bind(book.lent_date)
            .bind(&book.room)
            .bind(book.cabinet)
            .bind(book.shelf)
            .bind(book.row)
            .bind(book.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let query = format!("SELECT {} FROM books WHERE id = $1", book_columns());

        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn list_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>> {
        let query = format!(
            "SELECT {} FROM books ORDER BY id LIMIT $1 OFFSET $2",
            book_columns()
        );

        let books = sqlx::query_as::<_, Book>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    async fn list_filtered(&self, filters: &BookFilters) -> AppResult<Vec<Book>> {
        let mut query = filtered_query(filters);

        let books = query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    async fn update(&self, book: &Book) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = $1,
                author = $2,
                genre = $3,
                description = $4,
                status = $5,
                lent_to = $6,
                lent_date = $7,
                room = $8,
                cabinet = $9,
                shelf = $10,
                "row" = $11
            WHERE id = $12
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.status.as_str())
        .bind(&book.lent_to)
        .bind(book.lent_date)
        .bind(&book.room)
        .bind(book.cabinet)
        .bind(book.shelf)
        .bind(book.row)
        .bind(book.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                book.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: i32,
        transition: &StatusTransition,
    ) -> AppResult<Option<Book>> {
        let query = format!(
            r#"
            UPDATE books SET status = $1, lent_to = $2, lent_date = $3
            WHERE id = $4 AND {STATUS_EXPR} = $5
            RETURNING {}
            "#,
            book_columns()
        );

        let book = sqlx::query_as::<_, Book>(&query)
            .bind(transition.to.as_str())
            .bind(&transition.lent_to)
            .bind(transition.lent_date)
            .bind(id)
            .bind(transition.from.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }
}
