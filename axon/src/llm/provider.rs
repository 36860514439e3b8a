use async_trait::async_trait;

use super::{ChatModel, LlmApiClient, TextStream};
use crate::config::{parse_provider_model, LlmConfig};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
}

/// Chat model behind an OpenAI-compatible API, chosen by the `provider/model` string.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: LlmApiClient,
}

impl LlmProvider {
    /// Build the provider. A hosted provider without credentials fails here.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let (provider, _model) = parse_provider_model(&config.model);
        let client = LlmApiClient::new(config)?;

        let backend = match provider.to_lowercase().as_str() {
            "gemini" => LlmBackend::Gemini,
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => LlmBackend::OpenAICompatible {
                base_url: client.base_url().to_string(),
            },
        };

        tracing::info!(backend = ?backend, model = client.model(), "LLM provider ready");

        Ok(Self { backend, client })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl ChatModel for LlmProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.client.complete(prompt, None).await
    }

    async fn complete_stream(&self, prompt: &str) -> Result<TextStream> {
        self.client.complete_stream(prompt, None).await
    }

    fn model_name(&self) -> &str {
        self.client.model()
    }
}
