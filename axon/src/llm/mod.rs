mod api;
pub mod prompts;
mod provider;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;

pub use api::LlmApiClient;
pub use provider::{LlmBackend, LlmProvider};

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Prompt in, text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Incremental output. Defaults to a single delta holding the full completion.
    async fn complete_stream(&self, prompt: &str) -> Result<TextStream> {
        let text = self.complete(prompt).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    fn model_name(&self) -> &str;
}
