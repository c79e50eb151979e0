use std::sync::Arc;

use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    AddBookResponse, BookPayload, ErrorResponse, ListBooksResponse, MessageResponse, PageQuery,
};
use crate::books_repository::{BooksRepository, BooksRepositoryError};
use crate::validation;

const DEFAULT_PER_PAGE: u32 = 5;

fn invalid_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: Some("Invalid request".to_string()),
        message,
    })
}

fn not_found(message: String) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: Some("Not found".to_string()),
        message,
    })
}

// 500 carries a generic message, the cause goes to the log only
fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: None,
        message: "Internal server error".to_string(),
    })
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn list_books(
    books_repository: Data<Arc<dyn BooksRepository + Send + Sync>>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
    Ok(match books_repository.list_books(page, per_page).await {
        Ok(book_page) => HttpResponse::Ok().json(ListBooksResponse {
            books: book_page.books,
            total_pages: book_page.total_pages,
            current_page: page,
        }),
        Err(err) => {
            tracing::error!("List books failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn add_book(
    books_repository: Data<Arc<dyn BooksRepository + Send + Sync>>,
    payload: web::Json<BookPayload>,
) -> Result<HttpResponse, Error> {
    let draft = match validation::new_book(payload.into_inner()) {
        Ok(draft) => draft,
        Err(err) => return Ok(invalid_request(err.to_string())),
    };
    Ok(match books_repository.add_book(draft).await {
        Ok(id) => HttpResponse::Created().json(AddBookResponse {
            message: "Book added successfully!".to_string(),
            id,
        }),
        Err(err @ BooksRepositoryError::DuplicateIsbn(_)) => invalid_request(err.to_string()),
        Err(err) => {
            tracing::error!("Add book failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn get_book(
    books_repository: Data<Arc<dyn BooksRepository + Send + Sync>>,
    isbn: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.get_book(&isbn).await {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err @ BooksRepositoryError::NotFound(_)) => not_found(err.to_string()),
        Err(err) => {
            tracing::error!("Get book failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn update_book(
    books_repository: Data<Arc<dyn BooksRepository + Send + Sync>>,
    isbn: web::Path<String>,
    payload: web::Json<BookPayload>,
) -> Result<HttpResponse, Error> {
    // a missing book answers 404 before the payload is even looked at
    if let Err(err) = books_repository.get_book(&isbn).await {
        return Ok(match err {
            BooksRepositoryError::NotFound(_) => not_found(err.to_string()),
            err => {
                tracing::error!("Update book failed {}", err);
                internal_error()
            }
        });
    }
    let patch = match validation::book_patch(payload.into_inner()) {
        Ok(patch) => patch,
        Err(err) => return Ok(invalid_request(err.to_string())),
    };
    Ok(match books_repository.update_book(&isbn, patch).await {
        Ok(_) => HttpResponse::Ok().json(MessageResponse {
            message: "Book updated successfully!".to_string(),
        }),
        Err(err @ BooksRepositoryError::NotFound(_)) => not_found(err.to_string()),
        Err(err @ BooksRepositoryError::DuplicateIsbn(_)) => invalid_request(err.to_string()),
        Err(err) => {
            tracing::error!("Update book failed {}", err);
            internal_error()
        }
    })
}

#[api_v2_operation]
pub async fn delete_book(
    books_repository: Data<Arc<dyn BooksRepository + Send + Sync>>,
    isbn: web::Path<String>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.delete_book(&isbn).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse {
            message: "Book deleted successfully!".to_string(),
        }),
        Err(err @ BooksRepositoryError::NotFound(_)) => not_found(err.to_string()),
        Err(err) => {
            tracing::error!("Delete book failed {}", err);
            internal_error()
        }
    })
}
