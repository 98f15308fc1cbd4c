//! Repository layer for database operations

pub mod books;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::book::{Book, BookFilters, StatusTransition},
};

/// Persistence operations over the `books` table.
///
/// Implementations do not validate books; callers are expected to run
/// `Book::validate` first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Round trip to the backing store
    async fn ping(&self) -> AppResult<()>;

    /// Insert a new row and return it with its assigned id
    async fn create(&self, book: &Book) -> AppResult<Book>;

    async fn get_by_id(&self, id: i32) -> AppResult<Book>;

    /// Books ordered by id
    async fn list_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>>;

    async fn list_filtered(&self, filters: &BookFilters) -> AppResult<Vec<Book>>;

    /// Overwrite every mutable column of the row with `book.id`
    async fn update(&self, book: &Book) -> AppResult<()>;

    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Change status, borrower and lend date only if the row still has
    /// `transition.from` as its status. `None` means nothing matched.
    async fn transition_status(
        &self,
        id: i32,
        transition: &StatusTransition,
    ) -> AppResult<Option<Book>>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            pool,
        }
    }
}
