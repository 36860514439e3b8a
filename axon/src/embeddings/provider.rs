use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use super::api::{ApiConfig, EmbeddingApiClient};
use super::Embedder;
use crate::config::{
    default_base_url, parse_provider_model, provider_requires_api_key, EmbeddingsConfig,
};
use crate::error::{AxonError, Result};

#[derive(Clone)]
enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
    },
    Api {
        client: EmbeddingApiClient,
    },
}

/// Embedding provider selected from the `provider/model` string in config.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingProvider {
    /// Build the provider. Hosted providers without an API key are rejected here.
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);
        let batch_size = config.batch_size.max(1);

        let backend = if provider.eq_ignore_ascii_case("local") {
            EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(build_local_model(model_name)?)),
            }
        } else {
            let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
            if api_key.is_none() && provider_requires_api_key(provider) {
                return Err(AxonError::Config(format!(
                    "EMBEDDING_API_KEY (or GOOGLE_API_KEY) is required for embedding provider '{provider}'"
                )));
            }

            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string());

            EmbeddingBackend::Api {
                client: EmbeddingApiClient::new(ApiConfig {
                    base_url,
                    api_key,
                    model: model_name.to_string(),
                    timeout_secs: config.timeout_secs,
                    max_retries: config.max_retries,
                })?,
            }
        };

        tracing::info!(
            provider,
            model = model_name,
            dimensions = config.dimensions,
            "Embedding provider ready"
        );

        Ok(Self {
            backend,
            model: model_name.to_string(),
            dimensions: config.dimensions,
            batch_size,
        })
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Api { client } => {
                let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                client.embed(&refs).await
            }
            EmbeddingBackend::Local { model } => {
                let model = Arc::clone(model);
                let batch_size = self.batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        AxonError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| AxonError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| AxonError::Embedding(format!("Embedding worker failed: {e}")))?
            }
        }
    }

    fn check_dimensions(&self, vectors: &[Vec<f32>]) -> Result<()> {
        match vectors.iter().find(|v| v.len() != self.dimensions) {
            Some(v) => Err(AxonError::Embedding(format!(
                "Model returned {} dimensions, expected {}",
                v.len(),
                self.dimensions
            ))),
            None => Ok(()),
        }
    }

    fn is_local(&self) -> bool {
        matches!(self.backend, EmbeddingBackend::Local { .. })
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let batch: Vec<String> = if self.is_local() {
                // e5/bge style models expect a passage prefix
                batch.iter().map(|t| format!("passage: {t}")).collect()
            } else {
                batch.to_vec()
            };

            let mut embedded = self.embed_batch(batch).await?;
            self.check_dimensions(&embedded)?;
            all.append(&mut embedded);
        }

        Ok(all)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let input = if self.is_local() {
            format!("query: {text}")
        } else {
            text.to_string()
        };

        let embedded = self.embed_batch(vec![input]).await?;
        self.check_dimensions(&embedded)?;
        embedded
            .into_iter()
            .next()
            .ok_or_else(|| AxonError::Embedding("No embedding generated".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        _ => EmbeddingModel::BGESmallENV15,
    }
}

fn build_local_model(model_name: &str) -> Result<TextEmbedding> {
    let embedding_model = resolve_embedding_model(model_name);
    TextEmbedding::try_new(InitOptions::new(embedding_model).with_show_download_progress(true))
        .map_err(|e| AxonError::Embedding(e.to_string()))
}
