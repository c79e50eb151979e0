use anyhow::Context;
use tokio_postgres::error::SqlState;
use tokio_postgres::row::Row;
use tokio_postgres::{Client, NoTls, Statement};

use crate::api::{Book, BookId};
use crate::books_repository::{BookPage, BooksRepository, BooksRepositoryError};
use crate::validation::{BookDraft, BookPatch};

const BOOK_COLUMNS: &str = "id, title, author, published_date, isbn, pages";

pub struct PostgresBooksRepository {
    client: Client,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Postgres connection_str: {}", connection_str);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id              SERIAL PRIMARY KEY,
            title           TEXT NOT NULL,
            author          TEXT NOT NULL,
            published_date  DATE NOT NULL,
            isbn            TEXT NOT NULL UNIQUE,
            pages           INTEGER NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup books table")?;
        Ok(Self { client })
    }
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.as_db_error()
        // This is unique constraint validation error
        .map(|db_err| db_err.code() == &SqlState::from_code("23505"))
        .unwrap_or_default()
}

fn row_to_book(row: &Row) -> Result<Book, tokio_postgres::Error> {
    Ok(Book {
        id: row.try_get(0)?,
        title: row.try_get(1)?,
        author: row.try_get(2)?,
        published_date: row.try_get(3)?,
        isbn: row.try_get(4)?,
        pages: row.try_get(5)?,
    })
}

#[async_trait::async_trait]
impl BooksRepository for PostgresBooksRepository {
    async fn add_book(&self, draft: BookDraft) -> Result<BookId, BooksRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(
                "INSERT INTO books (title, author, published_date, isbn, pages) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[
                    &draft.title,
                    &draft.author,
                    &draft.published_date,
                    &draft.isbn,
                    &draft.pages,
                ],
            )
            .await;

        match rows {
            Ok(rows) => {
                let book_id: BookId = rows
                    .first()
                    .ok_or_else(|| BooksRepositoryError::Other("Id not returned".to_string()))?
                    .try_get(0)?;
                Ok(book_id)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(BooksRepositoryError::DuplicateIsbn(draft.isbn))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_book(&self, isbn: &str) -> Result<Book, BooksRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {} FROM books WHERE isbn = ($1)",
                BOOK_COLUMNS
            ))
            .await?;

        let rows = self.client.query(&stmt, &[&isbn]).await?;

        let row = rows
            .first()
            .ok_or_else(|| BooksRepositoryError::NotFound(isbn.to_string()))?;
        Ok(row_to_book(row)?)
    }

    async fn list_books(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<BookPage, BooksRepositoryError> {
        let count_stmt: Statement = self.client.prepare("SELECT COUNT(*) FROM books").await?;
        let count_rows = self.client.query(&count_stmt, &[]).await?;
        let total: i64 = count_rows
            .first()
            .ok_or_else(|| BooksRepositoryError::Other("Count not returned".to_string()))?
            .try_get(0)?;
        let total_pages = (total as u32).div_ceil(per_page);

        let stmt: Statement = self
            .client
            .prepare(&format!(
                "SELECT {} FROM books ORDER BY id LIMIT $1 OFFSET $2",
                BOOK_COLUMNS
            ))
            .await?;

        let limit = per_page as i64;
        let offset = page.saturating_sub(1) as i64 * limit;
        let rows = self.client.query(&stmt, &[&limit, &offset]).await?;

        let books = rows
            .iter()
            .map(row_to_book)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BookPage { books, total_pages })
    }

    async fn update_book(
        &self,
        isbn: &str,
        patch: BookPatch,
    ) -> Result<Book, BooksRepositoryError> {
        // Single statement keeps the write atomic: a unique violation on the
        // new ISBN leaves the row untouched.
        let stmt: Statement = self
            .client
            .prepare(&format!(
                "UPDATE books SET \
                     title = COALESCE($2, title), \
                     author = COALESCE($3, author), \
                     published_date = COALESCE($4, published_date), \
                     isbn = COALESCE($5, isbn), \
                     pages = COALESCE($6, pages) \
                 WHERE isbn = ($1) RETURNING {}",
                BOOK_COLUMNS
            ))
            .await?;

        let rows = self
            .client
            .query(
                &stmt,
                &[
                    &isbn,
                    &patch.title,
                    &patch.author,
                    &patch.published_date,
                    &patch.isbn,
                    &patch.pages,
                ],
            )
            .await;

        match rows {
            Ok(rows) => {
                let row = rows
                    .first()
                    .ok_or_else(|| BooksRepositoryError::NotFound(isbn.to_string()))?;
                Ok(row_to_book(row)?)
            }
            Err(err) if is_unique_violation(&err) => Err(BooksRepositoryError::DuplicateIsbn(
                patch.isbn.unwrap_or_else(|| isbn.to_string()),
            )),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_book(&self, isbn: &str) -> Result<(), BooksRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("DELETE FROM books WHERE isbn = ($1) RETURNING id")
            .await?;

        let rows = self.client.query(&stmt, &[&isbn]).await?;
        if rows.is_empty() {
            Err(BooksRepositoryError::NotFound(isbn.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod postgres_books_repository_tests {
    use chrono::NaiveDate;
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use crate::books_repository::{BooksRepository, BooksRepositoryError};
    use crate::validation::{BookDraft, BookPatch};

    async fn start_postgres_container_and_init_repo() -> (
        ContainerAsync<GenericImage>,
        crate::books_repository::PostgresBooksRepository,
    ) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = crate::books_repository::PostgresBooksRepository::init(
                crate::books_repository::PostgresBooksRepositoryConfig {
                    hostname: "127.0.0.1".to_string(),
                    username: "postgres".to_string(),
                    password: "postgres".to_string(),
                },
            )
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn draft(isbn: &str, title: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Test Author".to_string(),
            published_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            isbn: isbn.to_string(),
            pages: 200,
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests add_book, get_book and the duplicate ISBN conflict
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_add_book_get_it_and_reject_duplicate() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        let book_not_found = repo.get_book("0000000000").await;
        assert!(matches!(
            book_not_found,
            Err(BooksRepositoryError::NotFound(..))
        ));

        let book_draft = draft("1234567890", "Test Book");
        let id = repo
            .add_book(book_draft.clone())
            .await
            .expect("Failed to add book");

        let book = repo
            .get_book("1234567890")
            .await
            .expect("Failed to get book");
        assert_eq!(book.id, id);
        assert_eq!(book.title, book_draft.title);
        assert_eq!(book.published_date, book_draft.published_date);

        let duplicate = repo.add_book(draft("1234567890", "Second")).await;
        assert!(matches!(
            duplicate,
            Err(BooksRepositoryError::DuplicateIsbn(..))
        ));

        let unchanged = repo
            .get_book("1234567890")
            .await
            .expect("Failed to get book");
        assert_eq!(unchanged.title, "Test Book");
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests listing with pagination
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_add_books_and_list_them_paginated() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        let empty = repo.list_books(1, 5).await.expect("Failed to list books");
        assert_eq!(empty.books, vec![]);
        assert_eq!(empty.total_pages, 0);

        for i in 0..7 {
            repo.add_book(draft(&format!("isbn-{}", i), &format!("title{}", i)))
                .await
                .expect("Failed to add book");
        }

        let first_page = repo.list_books(1, 5).await.expect("Failed to list books");
        assert_eq!(first_page.total_pages, 2);
        assert_eq!(
            first_page
                .books
                .iter()
                .map(|book| book.title.as_str())
                .collect::<Vec<_>>(),
            vec!["title0", "title1", "title2", "title3", "title4"]
        );

        let second_page = repo.list_books(2, 5).await.expect("Failed to list books");
        assert_eq!(second_page.books.len(), 2);
        assert_eq!(second_page.total_pages, 2);
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests partial update, ISBN collision on update, and delete
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_patch_and_delete_book() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;

        let not_existing = repo.update_book("0000000000", BookPatch::default()).await;
        assert!(matches!(
            not_existing,
            Err(BooksRepositoryError::NotFound(..))
        ));

        repo.add_book(draft("1234567890", "Original"))
            .await
            .expect("Failed to add book");
        repo.add_book(draft("0987654321", "Other"))
            .await
            .expect("Failed to add book");

        let patched = repo
            .update_book(
                "1234567890",
                BookPatch {
                    title: Some("patchedTitle".to_string()),
                    pages: Some(250),
                    ..BookPatch::default()
                },
            )
            .await
            .expect("Failed to patch");
        assert_eq!(patched.title, "patchedTitle");
        assert_eq!(patched.pages, 250);
        assert_eq!(patched.author, "Test Author");

        let isbn_collision = repo
            .update_book(
                "1234567890",
                BookPatch {
                    isbn: Some("0987654321".to_string()),
                    ..BookPatch::default()
                },
            )
            .await;
        assert!(matches!(
            isbn_collision,
            Err(BooksRepositoryError::DuplicateIsbn(..))
        ));

        // conflict left the row unchanged
        let unchanged = repo
            .get_book("1234567890")
            .await
            .expect("Failed to get book");
        assert_eq!(unchanged.title, "patchedTitle");

        repo.delete_book("1234567890")
            .await
            .expect("Failed to delete book");
        let gone = repo.get_book("1234567890").await;
        assert!(matches!(gone, Err(BooksRepositoryError::NotFound(..))));

        let not_existing_delete = repo.delete_book("1234567890").await;
        assert!(matches!(
            not_existing_delete,
            Err(BooksRepositoryError::NotFound(..))
        ));
    }
}
