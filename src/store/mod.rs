//! Content store access
//!
//! The pipeline talks to the store only through [`ContentStore`]; the remote
//! HTTP implementation and the in-process one used for development and
//! tests both sit behind it.

mod http;
mod memory;

pub use http::HttpContentStore;
pub use memory::MemoryStore;

use crate::domain::aggregates::{CartRow, OrderSnapshot, ProductDetails, StockEntity, StockTarget};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the stock-bearing document behind `target`.
    async fn fetch_stock_entity(&self, target: &StockTarget) -> StoreResult<Option<StockEntity>>;

    /// Replace the entity's stock value. `Ok(None)` means the store answered
    /// without returning the updated document, which callers treat as a failed write.
    async fn replace_size_stock(&self, target: &StockTarget, size_stock: Value) -> StoreResult<Option<StockEntity>>;

    async fn fetch_product_details(&self, product_id: &str) -> StoreResult<Option<ProductDetails>>;

    async fn list_cart_rows(&self, user_id: &str) -> StoreResult<Vec<CartRow>>;

    async fn delete_cart_row(&self, document_id: &str) -> StoreResult<()>;

    /// Returns the identifier the store generated for the new document.
    async fn create_order_snapshot(&self, snapshot: &OrderSnapshot) -> StoreResult<String>;
}
