use chrono::NaiveDate;
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = i32;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// A single catalog record, as stored and as returned over the wire
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Calendar date, serialized as YYYY-MM-DD
    pub published_date: NaiveDate,
    pub isbn: String,
    pub pages: i32,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Raw request body for create and update. Every field is optional so that
/// presence checks are done by the validation layer rather than serde;
/// `published_date` stays a string until validation parses it.
pub struct BookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// One page of the catalog listing
pub struct ListBooksResponse {
    pub books: Vec<Book>,
    pub total_pages: u32,
    pub current_page: u32,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Pagination query params, both optional (page defaults to 1, per_page to 5)
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct AddBookResponse {
    pub message: String,
    pub id: BookId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Error body: `error` carries the failure kind for 4xx responses and is
/// omitted for generic 5xx responses
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}
