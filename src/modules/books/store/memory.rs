use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{apply_update, BookStore};
use crate::modules::books::error::BookError;
use crate::modules::books::models::{Book, BookId, CreateBook, ListQuery, Page, UpdateBook};
use crate::modules::books::validation;

#[derive(Default)]
struct Shelf {
    books: BTreeMap<BookId, Book>,
    /// Highest id ever handed out; survives deletes so ids are not reused.
    last_id: BookId,
}

impl Shelf {
    /// Id of a book other than `except` holding the (title, author) pair.
    fn holder_of(&self, title: &str, author: &str, except: Option<BookId>) -> Option<BookId> {
        self.books
            .values()
            .find(|b| Some(b.id) != except && b.title == title && b.author == author)
            .map(|b| b.id)
    }
}

/// In-process store, the default deployment mode.
#[derive(Default)]
pub struct MemoryBookStore {
    shelf: RwLock<Shelf>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, input: CreateBook) -> Result<Book, BookError> {
        validation::validate_create(&input)?;

        let mut shelf = self.shelf.write().await;
        if shelf.holder_of(&input.title, &input.author, None).is_some() {
            return Err(BookError::AlreadyExists {
                title: input.title,
                author: input.author,
            });
        }

        shelf.last_id += 1;
        let book = input.into_book(shelf.last_id, OffsetDateTime::now_utc());
        shelf.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Book>, BookError> {
        let shelf = self.shelf.read().await;
        let matching: Vec<&Book> = shelf.books.values().filter(|b| query.matches(b)).collect();
        let total = matching.len() as u64;

        let data = match query.pagination {
            Some(pagination) => {
                let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
                matching
                    .into_iter()
                    .skip(offset)
                    .take(pagination.limit as usize)
                    .cloned()
                    .collect()
            }
            None => matching.into_iter().cloned().collect(),
        };

        Ok(Page::new(data, total, query.pagination))
    }

    async fn get(&self, id: BookId) -> Result<Book, BookError> {
        let shelf = self.shelf.read().await;
        shelf.books.get(&id).cloned().ok_or(BookError::NotFound(id))
    }

    async fn update(&self, id: BookId, patch: UpdateBook) -> Result<Book, BookError> {
        let mut shelf = self.shelf.write().await;
        let existing = shelf.books.get(&id).ok_or(BookError::NotFound(id))?;
        let merged = apply_update(existing, &patch, OffsetDateTime::now_utc())?;

        if shelf
            .holder_of(&merged.title, &merged.author, Some(id))
            .is_some()
        {
            return Err(BookError::AlreadyExists {
                title: merged.title,
                author: merged.author,
            });
        }

        shelf.books.insert(id, merged.clone());
        Ok(merged)
    }

    async fn remove(&self, id: BookId) -> Result<(), BookError> {
        let mut shelf = self.shelf.write().await;
        shelf
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or(BookError::NotFound(id))
    }
}
