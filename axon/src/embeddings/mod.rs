mod api;
mod provider;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::error::Result;

pub use api::{ApiConfig, EmbeddingApiClient};
pub use provider::EmbeddingProvider;

/// Text to fixed-dimension vectors. One vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}
