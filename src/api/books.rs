//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorResponse},
    models::book::{Book, BookQuery},
};

/// Page size used when the caller gives no explicit limit
pub const DEFAULT_LIST_LIMIT: i64 = 100;

type IdPath = WithRejection<Path<i32>, AppError>;

/// Book list wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookListResponse {
    /// Number of books in this response
    pub count: usize,
    pub books: Vec<Book>,
}

/// Body of `GET /books`: a counted page for the plain listing, the bare
/// array of matches when any query parameter is given
#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum BookList {
    Page(BookListResponse),
    Filtered(Vec<Book>),
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookUpdatedResponse {
    pub message: String,
    pub book: Book,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookDeletedResponse {
    pub message: String,
    pub id: i32,
}

/// Lend request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LendRequest {
    /// Borrower name
    #[serde(default)]
    #[validate(length(min = 1, message = "Field 'lent_to' is required"))]
    pub lent_to: String,
}

fn positive_id(id: i32) -> AppResult<i32> {
    if id <= 0 {
        return Err(AppError::BadRequest("Book ID must be positive".to_string()));
    }
    Ok(id)
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

/// Map lend/return failures: unknown book is 404, a refused transition
/// keeps its 400, anything else is a failed write.
fn lending_error(err: AppError) -> AppError {
    match err {
        AppError::NotFound(_) => book_not_found(),
        AppError::InvalidTransition(_) => err,
        other => other.with_status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update book"),
    }
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = Book,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    WithRejection(Json(book), _): WithRejection<Json<Book>, AppError>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state
        .services
        .books
        .create_book(book)
        .await
        .map_err(|e| e.with_status(StatusCode::BAD_REQUEST, "Failed to create book"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 400, description = "Invalid book ID", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): IdPath,
) -> AppResult<Json<Book>> {
    let id = positive_id(id)?;

    let book = state
        .services
        .books
        .get_book(id)
        .await
        .map_err(|e| if e.is_not_found() { book_not_found() } else { e })?;

    Ok(Json(book))
}

/// List books, optionally filtered
///
/// Title, author and genre match case-insensitive substrings, status matches
/// exactly. Without any parameter the first 100 books are returned wrapped
/// with their count; with filters the matches are returned as an array.
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = BookList),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    WithRejection(Query(query), _): WithRejection<Query<BookQuery>, AppError>,
) -> AppResult<Json<BookList>> {
    let books = &state.services.books;
    let failed = |e: AppError| e.with_status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get books");

    if query.is_filtered() {
        let found = books
            .search_books(&query.into_filters(DEFAULT_LIST_LIMIT))
            .await
            .map_err(failed)?;
        return Ok(Json(BookList::Filtered(found)));
    }

    let page = books.list_books(DEFAULT_LIST_LIMIT, 0).await.map_err(failed)?;
    Ok(Json(BookList::Page(BookListResponse {
        count: page.len(),
        books: page,
    })))
}

/// Partially update a book
///
/// Only the fields present in the body are applied.
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body(content = Book, description = "Any subset of the book fields"),
    responses(
        (status = 200, description = "Book updated", body = BookUpdatedResponse),
        (status = 400, description = "Invalid book ID or body", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Update failed", body = ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(data), _): WithRejection<Json<Map<String, Value>>, AppError>,
) -> AppResult<Json<BookUpdatedResponse>> {
    let id = positive_id(id)?;

    let book = state
        .services
        .books
        .patch_book(id, &data)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => book_not_found(),
            other => other.with_status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update book"),
        })?;

    Ok(Json(BookUpdatedResponse {
        message: "Book updated successfully".to_string(),
        book,
    }))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted", body = BookDeletedResponse),
        (status = 400, description = "Invalid book ID", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Delete failed", body = ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): IdPath,
) -> AppResult<Json<BookDeletedResponse>> {
    let id = positive_id(id)?;

    state
        .services
        .books
        .delete_book(id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => book_not_found(),
            other => other.with_status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete book"),
        })?;

    Ok(Json(BookDeletedResponse {
        message: "Book deleted successfully".to_string(),
        id,
    }))
}

/// Lend an available book
#[utoipa::path(
    post,
    path = "/books/{id}/lend",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = LendRequest,
    responses(
        (status = 200, description = "Book lent", body = Book),
        (status = 400, description = "Missing borrower or book not available", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Update failed", body = ErrorResponse)
    )
)]
pub async fn lend_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): WithRejection<Json<LendRequest>, AppError>,
) -> AppResult<Json<Book>> {
    let id = positive_id(id)?;
    request.validate()?;

    let book = state
        .services
        .books
        .lend_book(id, &request.lent_to)
        .await
        .map_err(lending_error)?;

    Ok(Json(book))
}

/// Return a lent book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Book),
        (status = 400, description = "Book is not lent", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Update failed", body = ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    WithRejection(Path(id), _): IdPath,
) -> AppResult<Json<Book>> {
    let id = positive_id(id)?;

    let book = state
        .services
        .books
        .return_book(id)
        .await
        .map_err(lending_error)?;

    Ok(Json(book))
}
