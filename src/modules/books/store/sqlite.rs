use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use time::OffsetDateTime;

use super::{apply_update, BookStore};
use crate::modules::books::error::BookError;
use crate::modules::books::models::{
    fold_case, Book, BookId, CreateBook, ListQuery, Page, UpdateBook,
};
use crate::modules::books::validation;

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, publication_year, category, stock, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    author: String,
    isbn: String,
    publication_year: i32,
    category: String,
    stock: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            publication_year: row.publication_year,
            category: row.category,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<sqlx::Error> for BookError {
    fn from(err: sqlx::Error) -> Self {
        BookError::Storage(err.into())
    }
}

/// The engine's unique index is the final word on (title, author) conflicts;
/// the pre-check in each transaction only saves a round trip.
fn write_error(err: sqlx::Error, title: &str, author: &str) -> BookError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => BookError::AlreadyExists {
            title: title.to_string(),
            author: author.to_string(),
        },
        _ => err.into(),
    }
}

/// Books persisted in the `books` table. Expects the books module migrations
/// to have run.
#[derive(Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Writes take the database write lock up front. A deferred transaction
    /// that reads first fails with SQLITE_BUSY when another writer holds the
    /// lock, instead of waiting out the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, BookError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn pair_holder(
        conn: &mut SqliteConnection,
        title: &str,
        author: &str,
    ) -> Result<Option<BookId>, BookError> {
        let holder: Option<BookId> =
            sqlx::query_scalar("SELECT id FROM books WHERE title = ? AND author = ?")
                .bind(title)
                .bind(author)
                .fetch_optional(conn)
                .await?;
        Ok(holder)
    }

    async fn fetch(conn: &mut SqliteConnection, id: BookId) -> Result<Book, BookError> {
        let row: Option<BookRow> =
            sqlx::query_as(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
                .bind(id)
                .fetch_optional(conn)
                .await?;
        row.map(Book::from).ok_or(BookError::NotFound(id))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ListQuery) {
    let mut joiner = " WHERE ";
    if let Some(needle) = query.text() {
        builder
            .push(joiner)
            .push("(instr(title_folded, ")
            .push_bind(needle.to_owned())
            .push(") > 0 OR instr(author_folded, ")
            .push_bind(needle.to_owned())
            .push(") > 0)");
        joiner = " AND ";
    }
    if query.only_in_stock {
        builder.push(joiner).push("stock > 0");
    }
}

#[async_trait]
impl BookStore for SqliteBookStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, input: CreateBook) -> Result<Book, BookError> {
        validation::validate_create(&input)?;

        let mut tx = self.begin_write().await?;
        if Self::pair_holder(&mut tx, &input.title, &input.author)
            .await?
            .is_some()
        {
            return Err(BookError::AlreadyExists {
                title: input.title,
                author: input.author,
            });
        }

        let now = OffsetDateTime::now_utc();
        let row: BookRow = sqlx::query_as(&format!(
            "INSERT INTO books (title, author, isbn, publication_year, category, stock, \
             created_at, updated_at, title_folded, author_folded) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(input.title.as_str())
        .bind(input.author.as_str())
        .bind(input.isbn.as_str())
        .bind(input.publication_year)
        .bind(input.category.as_str())
        .bind(input.stock)
        .bind(now)
        .bind(now)
        .bind(fold_case(&input.title))
        .bind(fold_case(&input.author))
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| write_error(err, &input.title, &input.author))?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Book>, BookError> {
        // One read transaction so the count and the page see the same rows.
        let mut tx = self.pool.begin().await?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM books", BOOK_COLUMNS));
        push_filters(&mut select, query);
        select.push(" ORDER BY id");
        if let Some(pagination) = query.pagination {
            select
                .push(" LIMIT ")
                .push_bind(i64::from(pagination.limit))
                .push(" OFFSET ")
                .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));
        }
        let rows: Vec<BookRow> = select.build_query_as().fetch_all(&mut *tx).await?;

        tx.commit().await?;

        let data = rows.into_iter().map(Book::from).collect();
        Ok(Page::new(
            data,
            u64::try_from(total).unwrap_or_default(),
            query.pagination,
        ))
    }

    async fn get(&self, id: BookId) -> Result<Book, BookError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    async fn update(&self, id: BookId, patch: UpdateBook) -> Result<Book, BookError> {
        let mut tx = self.begin_write().await?;
        let existing = Self::fetch(&mut tx, id).await?;
        let merged = apply_update(&existing, &patch, OffsetDateTime::now_utc())?;

        let holder = Self::pair_holder(&mut tx, &merged.title, &merged.author).await?;
        if holder.is_some_and(|holder| holder != id) {
            return Err(BookError::AlreadyExists {
                title: merged.title,
                author: merged.author,
            });
        }

        let row: BookRow = sqlx::query_as(&format!(
            "UPDATE books SET title = ?, author = ?, isbn = ?, publication_year = ?, \
             category = ?, stock = ?, updated_at = ?, title_folded = ?, author_folded = ? \
             WHERE id = ? RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(merged.title.as_str())
        .bind(merged.author.as_str())
        .bind(merged.isbn.as_str())
        .bind(merged.publication_year)
        .bind(merged.category.as_str())
        .bind(merged.stock)
        .bind(merged.updated_at)
        .bind(fold_case(&merged.title))
        .bind(fold_case(&merged.author))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| write_error(err, &merged.title, &merged.author))?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn remove(&self, id: BookId) -> Result<(), BookError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookError::NotFound(id));
        }
        Ok(())
    }
}
