use std::sync::atomic::{AtomicI32, Ordering};

use crate::api::{Book, BookId};
use crate::books_repository::{BookPage, BooksRepository, BooksRepositoryError};
use crate::validation::{BookDraft, BookPatch};

pub struct InMemoryBooksRepository {
    book_sequence_generator: AtomicI32,
    // Vec keeps insertion order, which is the listing order
    books: parking_lot::RwLock<Vec<Book>>,
}

impl Default for InMemoryBooksRepository {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicI32::new(1),
            books: Default::default(),
        }
    }
}

#[async_trait::async_trait]
impl BooksRepository for InMemoryBooksRepository {
    async fn add_book(&self, draft: BookDraft) -> Result<BookId, BooksRepositoryError> {
        let mut locked_books = self.books.write();
        if locked_books.iter().any(|book| book.isbn == draft.isbn) {
            return Err(BooksRepositoryError::DuplicateIsbn(draft.isbn));
        }
        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        locked_books.push(Book {
            id,
            title: draft.title,
            author: draft.author,
            published_date: draft.published_date,
            isbn: draft.isbn,
            pages: draft.pages,
        });
        Ok(id)
    }

    async fn get_book(&self, isbn: &str) -> Result<Book, BooksRepositoryError> {
        self.books
            .read()
            .iter()
            .find(|book| book.isbn == isbn)
            .cloned()
            .ok_or_else(|| BooksRepositoryError::NotFound(isbn.to_string()))
    }

    async fn list_books(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<BookPage, BooksRepositoryError> {
        let locked_books = self.books.read();
        let total_pages = (locked_books.len() as u32).div_ceil(per_page);
        // widen before multiplying so a huge page number cannot overflow u32
        let offset = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
        let books = locked_books
            .iter()
            .skip(offset)
            .take(per_page as usize)
            .cloned()
            .collect();
        Ok(BookPage { books, total_pages })
    }

    async fn update_book(
        &self,
        isbn: &str,
        patch: BookPatch,
    ) -> Result<Book, BooksRepositoryError> {
        let mut locked_books = self.books.write();
        let position = locked_books
            .iter()
            .position(|book| book.isbn == isbn)
            .ok_or_else(|| BooksRepositoryError::NotFound(isbn.to_string()))?;

        if let Some(new_isbn) = patch.isbn.as_deref() {
            let collides = locked_books
                .iter()
                .enumerate()
                .any(|(index, book)| index != position && book.isbn == new_isbn);
            if collides {
                return Err(BooksRepositoryError::DuplicateIsbn(new_isbn.to_string()));
            }
        }

        let book = &mut locked_books[position];
        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(author) = patch.author {
            book.author = author;
        }
        if let Some(published_date) = patch.published_date {
            book.published_date = published_date;
        }
        if let Some(new_isbn) = patch.isbn {
            book.isbn = new_isbn;
        }
        if let Some(pages) = patch.pages {
            book.pages = pages;
        }
        Ok(book.clone())
    }

    async fn delete_book(&self, isbn: &str) -> Result<(), BooksRepositoryError> {
        let mut locked_books = self.books.write();
        let position = locked_books
            .iter()
            .position(|book| book.isbn == isbn)
            .ok_or_else(|| BooksRepositoryError::NotFound(isbn.to_string()))?;
        locked_books.remove(position);
        Ok(())
    }
}
