use chrono::NaiveDate;

use crate::api::BookPayload;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: '{0}'")]
    MissingField(&'static str),

    #[error("Invalid date format: '{0}', expected 'YYYY-MM-DD'")]
    InvalidDate(String),

    #[error("Field 'pages' must be a positive integer, got {0}")]
    InvalidPages(i32),
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// Validated create payload: everything a Book has except the storage-assigned id
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub isbn: String,
    pub pages: i32,
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
/// Validated partial update: only fields present in the payload are applied
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub pages: Option<i32>,
}

/// Maps a raw payload to a [BookDraft], requiring every field.
/// ISBN uniqueness is not checked here, that is a storage concern.
pub fn new_book(payload: BookPayload) -> Result<BookDraft, ValidationError> {
    let title = payload.title.ok_or(ValidationError::MissingField("title"))?;
    let author = payload
        .author
        .ok_or(ValidationError::MissingField("author"))?;
    let published_date = payload
        .published_date
        .ok_or(ValidationError::MissingField("published_date"))?;
    let isbn = payload.isbn.ok_or(ValidationError::MissingField("isbn"))?;
    let pages = payload.pages.ok_or(ValidationError::MissingField("pages"))?;

    Ok(BookDraft {
        title,
        author,
        published_date: parse_date(&published_date)?,
        isbn,
        pages: check_pages(pages)?,
    })
}

/// Maps a raw payload to a [BookPatch], re-checking `published_date` and
/// `pages` with the same rules as [new_book]
pub fn book_patch(payload: BookPayload) -> Result<BookPatch, ValidationError> {
    Ok(BookPatch {
        title: payload.title,
        author: payload.author,
        published_date: payload
            .published_date
            .as_deref()
            .map(parse_date)
            .transpose()?,
        isbn: payload.isbn,
        pages: payload.pages.map(check_pages).transpose()?,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

fn check_pages(pages: i32) -> Result<i32, ValidationError> {
    if pages >= 1 {
        Ok(pages)
    } else {
        Err(ValidationError::InvalidPages(pages))
    }
}
