use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Store-assigned book identifier. Never reused after deletion.
pub type BookId = i64;

/// Page size used when a listing asks for pagination without a limit.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Case folding used by text search. Every backend compares folded text, so
/// a search matches the same books whichever store is configured.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// A book in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier assigned by the store
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Stored as given; not required to be unique
    pub isbn: String,
    /// Year of publication, between 1800 and 2100
    pub publication_year: i32,
    pub category: String,
    /// Copies on hand, never negative
    pub stock: i64,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

/// Request model for creating a book. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub category: String,
    pub stock: i64,
}

impl CreateBook {
    /// Materialize a record with store-assigned identity and timestamps.
    pub fn into_book(self, id: BookId, now: OffsetDateTime) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            publication_year: self.publication_year,
            category: self.category,
            stock: self.stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl UpdateBook {
    /// Copy of `book` with every supplied field replaced and `updated_at` set
    /// to `now`.
    pub fn merge_into(&self, book: &Book, now: OffsetDateTime) -> Book {
        let mut merged = book.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(author) = &self.author {
            merged.author = author.clone();
        }
        if let Some(isbn) = &self.isbn {
            merged.isbn = isbn.clone();
        }
        if let Some(year) = self.publication_year {
            merged.publication_year = year;
        }
        if let Some(category) = &self.category {
            merged.category = category.clone();
        }
        if let Some(stock) = self.stock {
            merged.stock = stock;
        }
        merged.updated_at = now;
        merged
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Number of matching records skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Filter and paging options for listing books.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    text: Option<String>,
    pub only_in_stock: bool,
    /// `None` lists every match.
    pub pagination: Option<Pagination>,
}

impl ListQuery {
    /// Every book, unpaginated.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to books whose title or author contains `text`, ignoring
    /// case. Empty text clears the filter.
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        let needle = fold_case(text.as_ref());
        self.text = (!needle.is_empty()).then_some(needle);
        self
    }

    pub fn in_stock_only(mut self, only_in_stock: bool) -> Self {
        self.only_in_stock = only_in_stock;
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Case-folded search text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn matches(&self, book: &Book) -> bool {
        if self.only_in_stock && book.stock <= 0 {
            return false;
        }
        match &self.text {
            Some(needle) => {
                fold_case(&book.title).contains(needle.as_str())
                    || fold_case(&book.author).contains(needle.as_str())
            }
            None => true,
        }
    }
}

/// One page of results plus the number of matches before paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Envelope for `data` selected by `pagination`; an unpaginated listing
    /// reports itself as a single page holding every match.
    pub fn new(data: Vec<T>, total: u64, pagination: Option<Pagination>) -> Self {
        let pagination = pagination.unwrap_or(Pagination {
            page: 1,
            limit: u32::try_from(total).unwrap_or(u32::MAX),
        });
        Self {
            data,
            total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}
