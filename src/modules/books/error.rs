use libris_http::AppError;
use serde_json::json;
use thiserror::Error;

use super::models::BookId;
use super::validation::{self, FieldViolation};

/// Outcome of a failed store operation.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("invalid book: {}", describe(.0))]
    InvalidArgument(Vec<FieldViolation>),

    #[error("a book titled '{title}' by '{author}' already exists")]
    AlreadyExists { title: String, author: String },

    #[error("book {0} not found")]
    NotFound(BookId),

    /// Anything the backend reports that is not one of the above.
    #[error("book storage failure")]
    Storage(#[source] anyhow::Error),
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} {}", v.field, v.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<FieldViolation>> for BookError {
    fn from(violations: Vec<FieldViolation>) -> Self {
        BookError::InvalidArgument(violations)
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        let message = err.to_string();
        match err {
            BookError::InvalidArgument(violations) => {
                AppError::validation(validation::details(&violations), message)
            }
            BookError::AlreadyExists { title, author } => AppError::conflict(
                vec![json!({"title": title, "author": author})],
                message,
            ),
            BookError::NotFound(_) => AppError::not_found(message),
            BookError::Storage(source) => AppError::Internal(source.context(message)),
        }
    }
}
