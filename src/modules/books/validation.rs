//! Field rules shared by both store backends.

use serde::Serialize;
use serde_json::{json, Value};

use super::models::{CreateBook, Pagination, UpdateBook};

pub const MIN_PUBLICATION_YEAR: i32 = 1800;
pub const MAX_PUBLICATION_YEAR: i32 = 2100;

/// One rejected field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub error: String,
}

impl FieldViolation {
    fn new(field: &'static str, error: impl Into<String>) -> Self {
        Self {
            field,
            error: error.into(),
        }
    }
}

/// `{field, error}` objects for an error envelope's `details`.
pub fn details(violations: &[FieldViolation]) -> Vec<Value> {
    violations
        .iter()
        .map(|v| json!({ "field": v.field, "error": v.error }))
        .collect()
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn non_empty(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(FieldViolation::new(field, "must not be empty"));
        }
    }

    fn year(&mut self, field: &'static str, value: i32) {
        if !(MIN_PUBLICATION_YEAR..=MAX_PUBLICATION_YEAR).contains(&value) {
            self.0.push(FieldViolation::new(
                field,
                format!(
                    "must be between {} and {}",
                    MIN_PUBLICATION_YEAR, MAX_PUBLICATION_YEAR
                ),
            ));
        }
    }

    fn stock(&mut self, field: &'static str, value: i64) {
        if value < 0 {
            self.0.push(FieldViolation::new(
                field,
                "must be greater than or equal to 0",
            ));
        }
    }

    fn positive(&mut self, field: &'static str, value: u32) {
        if value == 0 {
            self.0.push(FieldViolation::new(field, "must be a positive integer"));
        }
    }

    fn finish(self) -> Result<(), Vec<FieldViolation>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

pub fn validate_create(input: &CreateBook) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Violations::default();
    violations.non_empty("title", &input.title);
    violations.non_empty("author", &input.author);
    violations.non_empty("isbn", &input.isbn);
    violations.year("publicationYear", input.publication_year);
    violations.non_empty("category", &input.category);
    violations.stock("stock", input.stock);
    violations.finish()
}

/// Same rules as creation, applied only to the fields present.
pub fn validate_update(patch: &UpdateBook) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Violations::default();
    if let Some(title) = &patch.title {
        violations.non_empty("title", title);
    }
    if let Some(author) = &patch.author {
        violations.non_empty("author", author);
    }
    if let Some(isbn) = &patch.isbn {
        violations.non_empty("isbn", isbn);
    }
    if let Some(year) = patch.publication_year {
        violations.year("publicationYear", year);
    }
    if let Some(category) = &patch.category {
        violations.non_empty("category", category);
    }
    if let Some(stock) = patch.stock {
        violations.stock("stock", stock);
    }
    violations.finish()
}

pub fn validate_pagination(pagination: &Pagination) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Violations::default();
    violations.positive("page", pagination.page);
    violations.positive("limit", pagination.limit);
    violations.finish()
}
