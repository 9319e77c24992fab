//! Behaviour every `BookStore` backend must share. Each check runs against a
//! fresh, empty store.

use std::collections::HashSet;
use std::future::Future;

use crate::modules::books::error::BookError;
use crate::modules::books::models::{CreateBook, ListQuery, Pagination, UpdateBook};

use super::BookStore;

pub(crate) fn clean_code() -> CreateBook {
    CreateBook {
        title: "Clean Code".to_string(),
        author: "Robert C. Martin".to_string(),
        isbn: "9780132350884".to_string(),
        publication_year: 2008,
        category: "tech".to_string(),
        stock: 5,
    }
}

fn titled(title: &str, author: &str, stock: i64) -> CreateBook {
    CreateBook {
        title: title.to_string(),
        author: author.to_string(),
        isbn: format!("isbn-{title}"),
        publication_year: 2001,
        category: "fiction".to_string(),
        stock,
    }
}

pub(crate) async fn run_all<S, F, Fut>(make: F)
where
    S: BookStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    assigns_distinct_ids(&make().await).await;
    rejects_duplicate_pair(&make().await).await;
    allows_shared_title_with_other_author(&make().await).await;
    rejects_invalid_fields(&make().await).await;
    missing_ids_are_not_found(&make().await).await;
    round_trip_keeps_client_fields(&make().await).await;
    paginates_and_filters(&make().await).await;
    text_search_folds_non_ascii_case(&make().await).await;
    text_search_keeps_whitespace(&make().await).await;
    lists_everything_without_pagination(&make().await).await;
    partial_update_merges(&make().await).await;
    update_conflicts_only_with_other_records(&make().await).await;
    repeated_update_is_idempotent(&make().await).await;
    remove_is_permanent(&make().await).await;
}

async fn assigns_distinct_ids(store: &dyn BookStore) {
    let mut ids = HashSet::new();
    for i in 0..5 {
        let book = store
            .create(titled(&format!("Volume {i}"), "Anon", 1))
            .await
            .unwrap();
        assert!(ids.insert(book.id), "id {} handed out twice", book.id);
    }
    assert!(ids.contains(&1), "first id should be 1, got {ids:?}");
}

async fn rejects_duplicate_pair(store: &dyn BookStore) {
    store.create(clean_code()).await.unwrap();

    let mut again = clean_code();
    again.isbn = "different".to_string();
    again.stock = 99;
    again.category = "other".to_string();

    match store.create(again).await {
        Err(BookError::AlreadyExists { title, author }) => {
            assert_eq!(title, "Clean Code");
            assert_eq!(author, "Robert C. Martin");
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

async fn allows_shared_title_with_other_author(store: &dyn BookStore) {
    store.create(titled("Dune", "Frank Herbert", 1)).await.unwrap();
    store.create(titled("Dune", "Brian Herbert", 1)).await.unwrap();
    // Comparison is exact, so case variants are distinct pairs.
    store.create(titled("dune", "Frank Herbert", 1)).await.unwrap();
}

async fn rejects_invalid_fields(store: &dyn BookStore) {
    let negative = CreateBook {
        stock: -1,
        ..clean_code()
    };
    assert!(matches!(
        store.create(negative).await,
        Err(BookError::InvalidArgument(_))
    ));

    let ancient = CreateBook {
        publication_year: 1799,
        ..clean_code()
    };
    assert!(matches!(
        store.create(ancient).await,
        Err(BookError::InvalidArgument(_))
    ));

    let created = store.create(clean_code()).await.unwrap();
    let patch = UpdateBook {
        stock: Some(-10),
        ..UpdateBook::default()
    };
    assert!(matches!(
        store.update(created.id, patch).await,
        Err(BookError::InvalidArgument(_))
    ));
    assert_eq!(store.get(created.id).await.unwrap().stock, 5);
}

async fn missing_ids_are_not_found(store: &dyn BookStore) {
    assert!(matches!(store.get(9999).await, Err(BookError::NotFound(9999))));
    assert!(matches!(
        store.update(9999, UpdateBook::default()).await,
        Err(BookError::NotFound(9999))
    ));
    assert!(matches!(store.remove(9999).await, Err(BookError::NotFound(9999))));
}

async fn round_trip_keeps_client_fields(store: &dyn BookStore) {
    let input = clean_code();
    let created = store.create(input.clone()).await.unwrap();
    let fetched = store.get(created.id).await.unwrap();

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.title, input.title);
    assert_eq!(fetched.author, input.author);
    assert_eq!(fetched.isbn, input.isbn);
    assert_eq!(fetched.publication_year, input.publication_year);
    assert_eq!(fetched.category, input.category);
    assert_eq!(fetched.stock, input.stock);
    assert_eq!(fetched.created_at, fetched.updated_at);
}

async fn paginates_and_filters(store: &dyn BookStore) {
    for i in 1..=15 {
        store
            .create(titled(&format!("Book {i}"), &format!("Author {i}"), i % 2))
            .await
            .unwrap();
    }

    let first = store
        .list(&ListQuery::all().paginate(Pagination::new(1, 5)))
        .await
        .unwrap();
    assert_eq!(first.data.len(), 5);
    assert_eq!(first.total, 15);
    assert_eq!((first.page, first.limit), (1, 5));
    let titles: Vec<&str> = first.data.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Book 1", "Book 2", "Book 3", "Book 4", "Book 5"]);

    let last = store
        .list(&ListQuery::all().paginate(Pagination::new(3, 5)))
        .await
        .unwrap();
    assert_eq!(last.data.len(), 5);
    assert_eq!(last.data[0].title, "Book 11");

    let beyond = store
        .list(&ListQuery::all().paginate(Pagination::new(4, 5)))
        .await
        .unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.total, 15);

    let in_stock = store
        .list(&ListQuery::all().in_stock_only(true).paginate(Pagination::new(1, 5)))
        .await
        .unwrap();
    assert_eq!(in_stock.total, 8);
    assert_eq!(in_stock.data.len(), 5);
    assert!(in_stock.data.iter().all(|b| b.stock > 0));

    // "book 1" hits Book 1 and Book 10..=15.
    let text = store
        .list(&ListQuery::all().with_text("BOOK 1").paginate(Pagination::default()))
        .await
        .unwrap();
    assert_eq!(text.total, 7);

    let by_author = store
        .list(&ListQuery::all().with_text("author 15"))
        .await
        .unwrap();
    assert_eq!(by_author.total, 1);
    assert_eq!(by_author.data[0].title, "Book 15");

    let both = store
        .list(&ListQuery::all().with_text("book 1").in_stock_only(true))
        .await
        .unwrap();
    // Book 1, 11, 13, 15 have odd numbers and so one copy each.
    assert_eq!(both.total, 4);
}

async fn text_search_folds_non_ascii_case(store: &dyn BookStore) {
    store
        .create(titled("École des femmes", "Molière", 1))
        .await
        .unwrap();
    store.create(titled("Dune", "Frank Herbert", 1)).await.unwrap();

    let by_title = store.list(&ListQuery::all().with_text("école")).await.unwrap();
    assert_eq!(by_title.total, 1);
    assert_eq!(by_title.data[0].author, "Molière");

    let by_author = store
        .list(&ListQuery::all().with_text("MOLIÈRE"))
        .await
        .unwrap();
    assert_eq!(by_author.total, 1);

    // Renaming refreshes what search sees.
    let renamed = UpdateBook {
        title: Some("Ÿvain".to_string()),
        ..UpdateBook::default()
    };
    store.update(by_title.data[0].id, renamed).await.unwrap();
    assert_eq!(store.list(&ListQuery::all().with_text("école")).await.unwrap().total, 0);
    assert_eq!(store.list(&ListQuery::all().with_text("ÿVAIN")).await.unwrap().total, 1);
}

async fn text_search_keeps_whitespace(store: &dyn BookStore) {
    store.create(clean_code()).await.unwrap();

    let padded = store.list(&ListQuery::all().with_text(" Clean")).await.unwrap();
    assert_eq!(padded.total, 0);

    let inner = store.list(&ListQuery::all().with_text("clean code")).await.unwrap();
    assert_eq!(inner.total, 1);
}

async fn lists_everything_without_pagination(store: &dyn BookStore) {
    for i in 0..12 {
        store
            .create(titled(&format!("Tome {i}"), "Anon", 0))
            .await
            .unwrap();
    }

    let page = store.list(&ListQuery::all()).await.unwrap();
    assert_eq!(page.data.len(), 12);
    assert_eq!((page.total, page.page, page.limit), (12, 1, 12));
}

async fn partial_update_merges(store: &dyn BookStore) {
    let created = store.create(clean_code()).await.unwrap();
    let patch = UpdateBook {
        stock: Some(10),
        ..UpdateBook::default()
    };

    let updated = store.update(created.id, patch).await.unwrap();
    assert_eq!(updated.stock, 10);
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    assert_eq!(store.get(created.id).await.unwrap().stock, 10);
}

async fn update_conflicts_only_with_other_records(store: &dyn BookStore) {
    let a = store.create(titled("A", "B", 1)).await.unwrap();
    let c = store.create(titled("C", "D", 1)).await.unwrap();

    let steal = UpdateBook {
        title: Some("A".to_string()),
        author: Some("B".to_string()),
        ..UpdateBook::default()
    };
    assert!(matches!(
        store.update(c.id, steal).await,
        Err(BookError::AlreadyExists { .. })
    ));
    assert_eq!(store.get(c.id).await.unwrap().title, "C");

    // Re-asserting a record's own pair is not a conflict.
    let same = UpdateBook {
        title: Some("A".to_string()),
        ..UpdateBook::default()
    };
    assert!(store.update(a.id, same).await.is_ok());

    // Changing only the author can collide too.
    let e = store.create(titled("A", "E", 1)).await.unwrap();
    let collide = UpdateBook {
        author: Some("B".to_string()),
        ..UpdateBook::default()
    };
    assert!(matches!(
        store.update(e.id, collide).await,
        Err(BookError::AlreadyExists { .. })
    ));
}

async fn repeated_update_is_idempotent(store: &dyn BookStore) {
    let created = store.create(clean_code()).await.unwrap();
    let patch = UpdateBook {
        category: Some("classics".to_string()),
        stock: Some(3),
        ..UpdateBook::default()
    };

    let mut once = store.update(created.id, patch.clone()).await.unwrap();
    let mut twice = store.update(created.id, patch).await.unwrap();
    assert!(twice.updated_at >= once.updated_at);

    once.updated_at = created.updated_at;
    twice.updated_at = created.updated_at;
    assert_eq!(once, twice);
}

async fn remove_is_permanent(store: &dyn BookStore) {
    let created = store.create(clean_code()).await.unwrap();
    store.remove(created.id).await.unwrap();

    assert!(matches!(
        store.get(created.id).await,
        Err(BookError::NotFound(_))
    ));
    assert!(matches!(
        store.remove(created.id).await,
        Err(BookError::NotFound(_))
    ));
    assert_eq!(store.list(&ListQuery::all()).await.unwrap().total, 0);
}
