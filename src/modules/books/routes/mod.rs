//! HTTP handlers for the Books module. They shape-check requests, call the
//! store, and leave status mapping to `AppError`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use libris_http::AppError;
use serde::Deserialize;

use super::models::{Book, BookId, CreateBook, ListQuery, Page, Pagination, UpdateBook};
use super::store::BookStore;
use super::validation;

pub type SharedStore = Arc<dyn BookStore>;

/// Routes relative to the module mount point.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book).patch(update_book).delete(delete_book))
        .with_state(store)
}

/// Query string accepted by `GET /books`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub q: Option<String>,
    pub con_stock: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    fn in_stock_only(&self) -> bool {
        self.con_stock
            .as_deref()
            .map(|flag| flag == "1" || flag.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// HTTP listings are always paginated, defaulting to page 1 of 10.
    pub fn into_query(self) -> Result<ListQuery, AppError> {
        let defaults = Pagination::default();
        let pagination = Pagination::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        );
        validation::validate_pagination(&pagination).map_err(|violations| {
            AppError::validation(
                validation::details(&violations),
                "invalid query parameters",
            )
        })?;

        let mut query = ListQuery::all()
            .in_stock_only(self.in_stock_only())
            .paginate(pagination);
        if let Some(text) = &self.q {
            query = query.with_text(text);
        }
        Ok(query)
    }
}

async fn create_book(
    State(store): State<SharedStore>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = payload?;
    let book = store.create(input).await?;
    tracing::info!(book_id = book.id, backend = store.backend(), "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(store): State<SharedStore>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = store.list(&query).await?;
    Ok(Json(page))
}

async fn get_book(
    State(store): State<SharedStore>,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(store.get(id).await?))
}

async fn update_book(
    State(store): State<SharedStore>,
    id: Result<Path<BookId>, PathRejection>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let book = store.update(id, patch).await?;
    tracing::info!(book_id = book.id, "book updated");
    Ok(Json(book))
}

async fn delete_book(
    State(store): State<SharedStore>,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    store.remove(id).await?;
    tracing::info!(book_id = id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::store::MemoryBookStore;
    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::{header, Method},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(MemoryBookStore::new()))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn clean_code() -> Value {
        json!({
            "title": "Clean Code",
            "author": "Robert C. Martin",
            "isbn": "9780132350884",
            "publicationYear": 2008,
            "category": "tech",
            "stock": 5
        })
    }

    #[test]
    fn con_stock_accepts_one_and_true() {
        let cases = [
            ("1", true),
            ("true", true),
            ("TRUE", true),
            ("0", false),
            ("no", false),
        ];
        for (flag, expected) in cases {
            let params = ListParams {
                con_stock: Some(flag.to_string()),
                ..ListParams::default()
            };
            assert_eq!(params.in_stock_only(), expected, "flag {flag}");
        }
        assert!(!ListParams::default().in_stock_only());
    }

    #[test]
    fn list_params_default_to_first_page_of_ten() {
        let query = ListParams::default().into_query().unwrap();
        assert_eq!(query.pagination, Some(Pagination::new(1, 10)));
        assert_eq!(query.text(), None);
    }

    #[test]
    fn zero_limit_is_invalid() {
        let params = ListParams {
            limit: Some(0),
            ..ListParams::default()
        };
        assert!(matches!(
            params.into_query(),
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn zero_page_reports_a_query_error() {
        let response = app()
            .oneshot(request(Method::GET, "/?page=0", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["message"], "invalid query parameters");
        assert_eq!(body["error"]["details"][0]["field"], "page");
    }

    #[tokio::test]
    async fn create_returns_201_with_record() {
        let response = app()
            .oneshot(request(Method::POST, "/", Some(clean_code())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["title"], "Clean Code");
        assert!(body["createdAt"].is_string());
    }

    #[tokio::test]
    async fn missing_field_is_400_not_422() {
        let mut payload = clean_code();
        payload.as_object_mut().unwrap().remove("isbn");

        let response = app()
            .oneshot(request(Method::POST, "/", Some(payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn non_numeric_id_is_400() {
        let response = app()
            .oneshot(request(Method::GET, "/abc", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_page_is_400() {
        let response = app()
            .oneshot(request(Method::GET, "/?page=first", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_returns_204_with_empty_body() {
        let app = app();
        app.clone()
            .oneshot(request(Method::POST, "/", Some(clean_code())))
            .await
            .unwrap();

        let response = app
            .oneshot(request(Method::DELETE, "/1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
