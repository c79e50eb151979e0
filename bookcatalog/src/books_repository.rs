pub use in_memory_books_repository::InMemoryBooksRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{Book, BookId};
use crate::validation::{BookDraft, BookPatch};

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BooksRepositoryError {
    #[error("Book with ISBN '{0}' not found")]
    NotFound(String),

    #[error("Book with ISBN '{0}' already exists")]
    DuplicateIsbn(String),

    #[error("Database failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// One page of the catalog, in insertion order
pub struct BookPage {
    pub books: Vec<Book>,
    pub total_pages: u32,
}

#[async_trait::async_trait]
pub trait BooksRepository {
    /// Adds a book to the catalog, returns the id assigned by storage.
    /// Fails with DuplicateIsbn if a book with the same ISBN already exists.
    async fn add_book(&self, draft: BookDraft) -> Result<BookId, BooksRepositoryError>;
    /// Retrieves a single book by its ISBN
    async fn get_book(&self, isbn: &str) -> Result<Book, BooksRepositoryError>;
    /// Lists books in insertion order. Pages are 1-based and per_page must be
    /// at least 1; a page past the end yields an empty slice.
    async fn list_books(&self, page: u32, per_page: u32)
        -> Result<BookPage, BooksRepositoryError>;
    /// Applies a partial update to the book with the given ISBN and returns
    /// the stored record. Fails with DuplicateIsbn if the patch would move the
    /// ISBN onto another existing book.
    async fn update_book(&self, isbn: &str, patch: BookPatch)
        -> Result<Book, BooksRepositoryError>;
    /// Removes the book with the given ISBN
    async fn delete_book(&self, isbn: &str) -> Result<(), BooksRepositoryError>;
}
