//! The CMS boundary: reading documents by query and committing mutations.

pub mod http;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::mutation::types::{Mutation, MutationResponse};

pub use http::HttpStore;
pub use memory::MemoryStore;
pub use query::DocumentQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("mutation rejected: {0}")]
    Rejected(String),
}

/// A content dataset that can be queried and written.
///
/// Every call is awaited before the next one is issued; implementations need
/// not support concurrent callers beyond being `Send + Sync`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Run a query and return the matching raw documents.
    async fn fetch(&self, query: &DocumentQuery) -> Result<Vec<Value>, StoreError>;

    /// Apply mutations as one transaction.
    async fn commit(&self, mutations: Vec<Mutation>) -> Result<MutationResponse, StoreError>;

    /// Create the document, or fully replace the one with the same `_id`.
    async fn create_or_replace(&self, document: Value) -> Result<MutationResponse, StoreError> {
        self.commit(vec![Mutation::CreateOrReplace(document)]).await
    }
}
