//! Record store contract and its two backends.

use async_trait::async_trait;
use time::OffsetDateTime;

use super::error::BookError;
use super::models::{Book, BookId, CreateBook, ListQuery, Page, UpdateBook};
use super::validation;

pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod conformance;

pub use memory::MemoryBookStore;
pub use sqlite::SqliteBookStore;

/// Authoritative collection of books.
///
/// Implementations enforce: (title, author) unique, stock never negative,
/// ids never reused. Each call is atomic with respect to other calls.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short backend label for logs.
    fn backend(&self) -> &'static str;

    async fn create(&self, input: CreateBook) -> Result<Book, BookError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<Book>, BookError>;

    async fn get(&self, id: BookId) -> Result<Book, BookError>;

    async fn update(&self, id: BookId, patch: UpdateBook) -> Result<Book, BookError>;

    async fn remove(&self, id: BookId) -> Result<(), BookError>;
}

/// Validate `patch` against the stored record and return the merged result.
/// The caller still owns the uniqueness check.
pub(crate) fn apply_update(
    existing: &Book,
    patch: &UpdateBook,
    now: OffsetDateTime,
) -> Result<Book, BookError> {
    validation::validate_update(patch)?;
    Ok(patch.merge_into(existing, now))
}
