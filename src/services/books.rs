//! Book inventory service: field rules and the lend/return state machine

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilters, BookStatus, StatusTransition},
    repository::BookStore,
};

/// Conditional updates tried before giving up on a contended book
const TRANSITION_ATTEMPTS: usize = 2;

const STATUS_CONFLICT: &str = "Book status was changed by another request";

fn already_lent(status: &BookStatus) -> String {
    format!("Book is already {}", status)
}

fn not_lent(status: &BookStatus) -> String {
    format!("Book is not lent (current status: {})", status)
}

#[derive(Clone)]
pub struct BooksService {
    store: Arc<dyn BookStore>,
}

impl BooksService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    /// Validate, fill defaults and persist a new book
    pub async fn create_book(&self, mut book: Book) -> AppResult<Book> {
        book.validate()?;
        book.set_defaults();

        let created = self.store.create(&book).await?;
        tracing::info!(id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store.get_by_id(id).await
    }

    pub async fn list_books(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>> {
        self.store.list_all(limit, offset).await
    }

    pub async fn search_books(&self, filters: &BookFilters) -> AppResult<Vec<Book>> {
        self.store.list_filtered(filters).await
    }

    /// Validate and overwrite all mutable fields of an existing book
    pub async fn update_book(&self, book: Book) -> AppResult<Book> {
        book.validate()?;
        self.store.update(&book).await?;
        tracing::info!(id = book.id, "Book updated");
        Ok(book)
    }

    /// Apply a partial update on top of the stored book
    pub async fn patch_book(&self, id: i32, data: &Map<String, Value>) -> AppResult<Book> {
        let mut book = self.store.get_by_id(id).await?;
        book.apply_patch(data);
        book.id = id;
        self.update_book(book).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.store.delete(id).await?;
        tracing::info!(id, "Book deleted");
        Ok(())
    }

    /// Lend an available book to `borrower`
    pub async fn lend_book(&self, id: i32, borrower: &str) -> AppResult<Book> {
        let book = self.store.get_by_id(id).await?;
        if book.status != BookStatus::Available {
            return Err(AppError::InvalidTransition(already_lent(&book.status)));
        }

        let lent = self
            .transition(id, StatusTransition::lend(borrower, Utc::now()), already_lent)
            .await?;
        tracing::info!(id, lent_to = %lent.lent_to, "Book lent");
        Ok(lent)
    }

    /// Take a lent book back
    pub async fn return_book(&self, id: i32) -> AppResult<Book> {
        let book = self.store.get_by_id(id).await?;
        if book.status != BookStatus::Lent {
            return Err(AppError::InvalidTransition(not_lent(&book.status)));
        }

        let returned = self
            .transition(id, StatusTransition::give_back(), not_lent)
            .await?;
        tracing::info!(id, "Book returned");
        Ok(returned)
    }

    /// Run a conditional status change. When another request changed the
    /// status first, report it the same way the upfront check would have.
    /// A status that was changed and restored in between is retried.
    async fn transition(
        &self,
        id: i32,
        transition: StatusTransition,
        describe: fn(&BookStatus) -> String,
    ) -> AppResult<Book> {
        for _ in 0..TRANSITION_ATTEMPTS {
            if let Some(book) = self.store.transition_status(id, &transition).await? {
                return Ok(book);
            }

            let current = self.store.get_by_id(id).await?;
            if current.status != transition.from {
                tracing::warn!(id, status = %current.status, "Concurrent status change");
                return Err(AppError::InvalidTransition(describe(&current.status)));
            }
            tracing::debug!(id, status = %current.status, "Status restored concurrently, retrying");
        }

        tracing::warn!(id, "Status kept changing concurrently");
        Err(AppError::InvalidTransition(STATUS_CONFLICT.to_string()))
    }
}
