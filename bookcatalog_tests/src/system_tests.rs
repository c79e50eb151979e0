use rand::distributions::{Alphanumeric, DistString};

use bookcatalog::api::BookPayload;
use bookcatalog::client::BookCatalogClient;

fn random_isbn() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), 13)
}

#[tokio::test]
/// Simple test for the book catalog service
/// Creates a book
/// Gets the book by ISBN
/// Updates the book with a partial payload
/// Lists books and checks that the book is there
/// Deletes the book and checks it is gone
async fn bookcatalog_e2e_test() {
    let bookcatalog_url = "http://127.0.0.1:8080";
    let bookcatalog_client =
        BookCatalogClient::new(bookcatalog_url).expect("Failed to create client");

    let isbn = random_isbn();
    let payload = BookPayload {
        title: Some("title1".to_string()),
        author: Some("Author1".to_string()),
        published_date: Some("2023-01-01".to_string()),
        isbn: Some(isbn.clone()),
        pages: Some(200),
    };

    let book_id = bookcatalog_client
        .add_book(payload.clone())
        .await
        .expect("Failed to add book");

    let returned_book = bookcatalog_client
        .get_book(&isbn)
        .await
        .expect("Failed to get book")
        .expect("Book not found");

    assert_eq!(returned_book.id, book_id);
    assert_eq!(Some(returned_book.title), payload.title);
    assert_eq!(Some(returned_book.author), payload.author);
    assert_eq!(returned_book.isbn, isbn);

    let updated_title = format!("updated title {}", random_isbn());
    let patch = BookPayload {
        title: Some(updated_title.clone()),
        ..BookPayload::default()
    };

    let updated = bookcatalog_client
        .update_book(&isbn, patch)
        .await
        .expect("Failed to update book");
    assert!(updated);

    let returned_book = bookcatalog_client
        .get_book(&isbn)
        .await
        .expect("Failed to get book")
        .expect("Book not found");
    assert_eq!(returned_book.title, updated_title);
    assert_eq!(Some(returned_book.author), payload.author);

    let mut found = false;
    let mut page = 1;
    loop {
        let listing = bookcatalog_client
            .list_books(page, 50)
            .await
            .expect("Failed to list books");
        if listing
            .books
            .iter()
            .any(|book| book.id == book_id && book.title == updated_title)
        {
            found = true;
            break;
        }
        if page >= listing.total_pages {
            break;
        }
        page += 1;
    }
    assert!(found, "Added book not present in the listing");

    let deleted = bookcatalog_client
        .delete_book(&isbn)
        .await
        .expect("Failed to delete book");
    assert!(deleted);

    let gone = bookcatalog_client
        .get_book(&isbn)
        .await
        .expect("Failed to get book");
    assert!(gone.is_none());

    let deleted_again = bookcatalog_client
        .delete_book(&isbn)
        .await
        .expect("Failed to delete book");
    assert!(!deleted_again);
}

#[tokio::test]
/// Validation failures reported by a live instance
async fn bookcatalog_validation_errors_test() {
    let bookcatalog_url = "http://127.0.0.1:8080";
    let bookcatalog_client =
        BookCatalogClient::new(bookcatalog_url).expect("Failed to create client");

    let missing_title = BookPayload {
        title: None,
        author: Some("Author1".to_string()),
        published_date: Some("2023-01-01".to_string()),
        isbn: Some(random_isbn()),
        pages: Some(200),
    };
    let result = bookcatalog_client.add_book(missing_title).await;
    assert!(result.is_err());

    let bad_date = BookPayload {
        title: Some("title1".to_string()),
        author: Some("Author1".to_string()),
        published_date: Some("2023/01/01".to_string()),
        isbn: Some(random_isbn()),
        pages: Some(200),
    };
    let result = bookcatalog_client.add_book(bad_date).await;
    assert!(result.is_err());
}
