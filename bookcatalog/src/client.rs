use anyhow::{bail, Context};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::api::{AddBookResponse, Book, BookId, BookPayload, ListBooksResponse};

pub struct BookCatalogClient {
    url: String,
    client: ClientWithMiddleware,
}

impl BookCatalogClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls POST /books endpoint
    /// Returns the id assigned to the added book
    pub async fn add_book(&self, payload: BookPayload) -> anyhow::Result<BookId> {
        let response = self
            .client
            .post(format!("{}/books", self.url))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: String = response.text().await.unwrap_or_default();
            bail!("Failed to add book {}", error)
        }

        let added: AddBookResponse = response.json().await?;
        Ok(added.id)
    }

    /// Calls GET /books/{isbn} endpoint
    /// Returns the book if it was present
    /// None if the book was not in the catalog
    /// and error in case of any other failure
    pub async fn get_book(&self, isbn: &str) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/books/{}", self.url, isbn))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            let error: String = response.text().await.unwrap_or_default();
            bail!("Failed to get book {}", error)
        }
    }

    /// Calls GET /books endpoint with pagination params
    pub async fn list_books(&self, page: u32, per_page: u32) -> anyhow::Result<ListBooksResponse> {
        let response = self
            .client
            .get(format!(
                "{}/books?page={}&per_page={}",
                self.url, page, per_page
            ))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: String = response.text().await.unwrap_or_default();
            bail!("Failed to list books {}", error)
        }
    }

    /// Calls PUT /books/{isbn} endpoint with a partial payload
    /// Returns true if successful and false if the book was not found
    pub async fn update_book(&self, isbn: &str, payload: BookPayload) -> anyhow::Result<bool> {
        let response = self
            .client
            .put(format!("{}/books/{}", self.url, isbn))
            .json(&payload)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            let error: String = response.text().await.unwrap_or_default();
            bail!("Failed to update book {}", error)
        }
    }

    /// Calls DELETE /books/{isbn} endpoint
    /// Returns true if successful and false if the book was not found
    pub async fn delete_book(&self, isbn: &str) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/books/{}", self.url, isbn))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            let error: String = response.text().await.unwrap_or_default();
            bail!("Failed to delete book {}", error)
        }
    }
}
