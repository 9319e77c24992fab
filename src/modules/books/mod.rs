pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::{InitCtx, Migration, Module};
use serde_json::{json, Value};
use utoipa::PartialSchema;

pub use error::BookError;
pub use models::{Book, BookId, CreateBook, ListQuery, Page, Pagination, UpdateBook};
pub use store::{BookStore, MemoryBookStore, SqliteBookStore};

const BOOKS_SCHEMA: &str = r#"
CREATE TABLE books (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    title            TEXT    NOT NULL CHECK (title <> ''),
    author           TEXT    NOT NULL CHECK (author <> ''),
    isbn             TEXT    NOT NULL CHECK (isbn <> ''),
    publication_year INTEGER NOT NULL CHECK (publication_year BETWEEN 1800 AND 2100),
    category         TEXT    NOT NULL CHECK (category <> ''),
    stock            INTEGER NOT NULL CHECK (stock >= 0),
    created_at       TEXT    NOT NULL,
    updated_at       TEXT    NOT NULL,
    -- Case-folded copies written by the application; text search reads these.
    title_folded     TEXT    NOT NULL,
    author_folded    TEXT    NOT NULL,
    CONSTRAINT books_title_author_unique UNIQUE (title, author)
);
"#;

/// Book inventory: CRUD over a single `Book` entity backed by a
/// [`BookStore`].
pub struct BooksModule {
    store: Arc<dyn BookStore>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            backend = self.store.backend(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: BOOKS_SCHEMA,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn schema_of<T: PartialSchema>() -> Value {
    serde_json::to_value(T::schema()).unwrap_or_else(|_| json!({ "type": "object" }))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn query_parameter(name: &str, schema: Value, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "description": description,
        "schema": schema
    })
}

/// Paths are relative to the module mount point.
fn openapi_fragment() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        query_parameter("q", json!({ "type": "string" }), "Case-insensitive substring of title or author"),
                        query_parameter("conStock", json!({ "type": "string", "enum": ["1", "true", "0", "false"] }), "Only books with stock above zero"),
                        query_parameter("page", json!({ "type": "integer", "minimum": 1, "default": 1 }), "1-based page number"),
                        query_parameter("limit", json!({ "type": "integer", "minimum": 1, "default": 10 }), "Page size")
                    ],
                    "responses": {
                        "200": {
                            "description": "One page of matching books",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookPage" }
                                }
                            }
                        },
                        "400": error_response("Malformed query")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": json_body("CreateBook"),
                    "responses": {
                        "201": book_response("Book created"),
                        "400": error_response("Invalid field"),
                        "409": error_response("Title and author already exist")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Fetch a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": book_response("The book"),
                        "400": error_response("Malformed id"),
                        "404": error_response("No book with that id")
                    }
                },
                "patch": {
                    "summary": "Update some fields of a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": json_body("UpdateBook"),
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Invalid field"),
                        "404": error_response("No book with that id"),
                        "409": error_response("Title and author belong to another book")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("No book with that id")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": schema_of::<Book>(),
                "CreateBook": schema_of::<CreateBook>(),
                "UpdateBook": schema_of::<UpdateBook>(),
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "data": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        },
                        "total": { "type": "integer", "description": "Matches before paging" },
                        "page": { "type": "integer" },
                        "limit": { "type": "integer" }
                    },
                    "required": ["data", "total", "page", "limit"]
                }
            }
        }
    })
}

/// Create the books module over `store`.
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
