//! Book model, its lending status and field rules

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

/// Room assigned to a book when none is given
pub const DEFAULT_ROOM: &str = "Гостиная";

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

fn default_position() -> i32 {
    1
}

/// Lending status of a book.
///
/// Only `available` and `lent` take part in lend/return; any other value
/// written through a partial update is kept verbatim as `Other`.
/// An empty status reads as `Available`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookStatus {
    #[default]
    Available,
    Lent,
    Other(String),
}

impl BookStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Lent => "lent",
            BookStatus::Other(s) => s,
        }
    }
}

impl From<String> for BookStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "available" => BookStatus::Available,
            "lent" => BookStatus::Lent,
            _ => BookStatus::Other(s),
        }
    }
}

impl From<&str> for BookStatus {
    fn from(s: &str) -> Self {
        BookStatus::from(s.to_string())
    }
}

impl From<BookStatus> for String {
    fn from(status: BookStatus) -> Self {
        match status {
            BookStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Assigned by the store on creation
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "available")]
    pub status: BookStatus,
    /// Borrower name, empty when the book is not lent
    #[serde(default)]
    pub lent_to: String,
    #[serde(default)]
    pub lent_date: Option<DateTime<Utc>>,
    #[serde(default = "default_room")]
    pub room: String,
    #[serde(default = "default_position")]
    pub cabinet: i32,
    #[serde(default = "default_position")]
    pub shelf: i32,
    #[serde(default = "default_position")]
    pub row: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// First rule a book breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    TitleRequired,
    #[error("author is required")]
    AuthorRequired,
    #[error("room is required")]
    RoomRequired,
    #[error("cabinet must be positive")]
    CabinetNotPositive,
    #[error("shelf must be positive")]
    ShelfNotPositive,
    #[error("row must be positive")]
    RowNotPositive,
}

impl Book {
    /// New unsaved book in the default location
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            author: author.into(),
            genre: String::new(),
            description: String::new(),
            status: BookStatus::Available,
            lent_to: String::new(),
            lent_date: None,
            room: default_room(),
            cabinet: 1,
            shelf: 1,
            row: 1,
            created_at: None,
        }
    }

    /// Fill in the creation timestamp if it was never set.
    ///
    /// Status needs no defaulting: an empty status already reads as available.
    pub fn set_defaults(&mut self) {
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
    }

    /// Check required fields, stopping at the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if self.author.is_empty() {
            return Err(ValidationError::AuthorRequired);
        }
        if self.room.is_empty() {
            return Err(ValidationError::RoomRequired);
        }
        if self.cabinet <= 0 {
            return Err(ValidationError::CabinetNotPositive);
        }
        if self.shelf <= 0 {
            return Err(ValidationError::ShelfNotPositive);
        }
        if self.row <= 0 {
            return Err(ValidationError::RowNotPositive);
        }
        Ok(())
    }

    /// Apply a partial update from an arbitrary JSON object.
    ///
    /// Title, author, status and room change only on a non-empty string.
    /// Genre, description and lent_to take any string. Cabinet, shelf and
    /// row change only on a number greater than zero. Everything else in
    /// `data` (including `id`) is ignored.
    pub fn apply_patch(&mut self, data: &Map<String, Value>) {
        let string = |key: &str| data.get(key).and_then(Value::as_str);
        let non_empty = |key: &str| string(key).filter(|s| !s.is_empty());
        let positive = |key: &str| {
            data.get(key)
                .and_then(Value::as_f64)
                .filter(|n| *n > 0.0)
                .map(|n| n as i32)
        };

        if let Some(title) = non_empty("title") {
            self.title = title.to_string();
        }
        if let Some(author) = non_empty("author") {
            self.author = author.to_string();
        }
        if let Some(genre) = string("genre") {
            self.genre = genre.to_string();
        }
        if let Some(description) = string("description") {
            self.description = description.to_string();
        }
        if let Some(status) = non_empty("status") {
            self.status = BookStatus::from(status);
        }
        if let Some(lent_to) = string("lent_to") {
            self.lent_to = lent_to.to_string();
        }
        if let Some(room) = non_empty("room") {
            self.room = room.to_string();
        }
        if let Some(cabinet) = positive("cabinet") {
            self.cabinet = cabinet;
        }
        if let Some(shelf) = positive("shelf") {
            self.shelf = shelf;
        }
        if let Some(row) = positive("row") {
            self.row = row;
        }
    }
}

/// Search filters for listing books
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilters {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Case-insensitive substring of the genre
    pub genre: Option<String>,
    /// Exact status
    pub status: Option<String>,
    /// No limit when <= 0
    pub limit: i64,
    /// Ignored unless a limit is set and the offset is > 0
    pub offset: i64,
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl BookQuery {
    /// Whether the caller asked for anything beyond the default listing
    pub fn is_filtered(&self) -> bool {
        [&self.title, &self.author, &self.genre, &self.status]
            .iter()
            .any(|f| f.as_deref().is_some_and(|s| !s.is_empty()))
            || self.limit.is_some()
            || self.offset.is_some()
    }

    pub fn into_filters(self, default_limit: i64) -> BookFilters {
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
        BookFilters {
            title: non_empty(self.title),
            author: non_empty(self.author),
            genre: non_empty(self.genre),
            status: non_empty(self.status),
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Conditional status change used by lend and return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    /// Status the row must still have for the change to apply
    pub from: BookStatus,
    pub to: BookStatus,
    pub lent_to: String,
    pub lent_date: Option<DateTime<Utc>>,
}

impl StatusTransition {
    pub fn lend(borrower: &str, at: DateTime<Utc>) -> Self {
        Self {
            from: BookStatus::Available,
            to: BookStatus::Lent,
            lent_to: borrower.to_string(),
            lent_date: Some(at),
        }
    }

    pub fn give_back() -> Self {
        Self {
            from: BookStatus::Lent,
            to: BookStatus::Available,
            lent_to: String::new(),
            lent_date: None,
        }
    }
}
