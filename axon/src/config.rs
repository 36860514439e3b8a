use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// First non-empty value among the given variables.
fn env_first(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| env::var(var).ok())
        .find(|val| !val.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub processing: ProcessingConfig,
    pub retrieval: RetrievalConfig,
    pub gateway: GatewayConfig,
    pub persona: PersonaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// LLM configuration for the persona chat model
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: Option<f32>,
}

/// Chunking and binary-content filter policy
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Extracted text shorter than this is skipped instead of chunked.
    pub min_content_chars: usize,
    /// Texts longer than this many characters are checked for binary content.
    pub binary_sample_threshold: usize,
    pub binary_non_ascii_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: u32,
    pub history_window: usize,
    pub upsert_batch_size: usize,
}

/// Content-addressed document gateway (IPFS over HTTP)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaConfig {
    pub key_prefix: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_content_chars: 20,
            binary_sample_threshold: 100,
            binary_non_ascii_ratio: 0.5,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            history_window: 5,
            upsert_batch_size: 50,
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            key_prefix: crate::models::DEFAULT_PERSONA_PREFIX.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let shared_google_key = env::var("GOOGLE_API_KEY").ok();

        Self {
            server: ServerConfig {
                host: env::var("AXON_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("AXON_PORT", 3000),
                max_upload_bytes: parse_env_or("AXON_MAX_UPLOAD_BYTES", 25 * 1024 * 1024),
                request_timeout_secs: parse_env_or("AXON_REQUEST_TIMEOUT_SECS", 60),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:axon.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "gemini/text-embedding-004".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 768),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 100),
                api_key: env::var("EMBEDDING_API_KEY")
                    .ok()
                    .or_else(|| shared_google_key.clone()),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 3),
            },
            llm: LlmConfig {
                model: env::var("LLM_MODEL")
                    .unwrap_or_else(|_| "gemini/gemini-2.0-flash-001".to_string()),
                api_key: env::var("LLM_API_KEY").ok().or(shared_google_key),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 60),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
                temperature: parse_env_opt("LLM_TEMPERATURE"),
            },
            processing: ProcessingConfig {
                chunk_size: parse_env_or("CHUNK_SIZE", 1000),
                chunk_overlap: parse_env_or("CHUNK_OVERLAP", 200),
                min_content_chars: parse_env_or("MIN_CONTENT_CHARS", 20),
                binary_sample_threshold: parse_env_or("BINARY_SAMPLE_THRESHOLD", 100),
                binary_non_ascii_ratio: parse_env_or("BINARY_NON_ASCII_RATIO", 0.5),
            },
            retrieval: RetrievalConfig {
                top_k: parse_env_or("RETRIEVAL_TOP_K", 5),
                history_window: parse_env_or("CHAT_HISTORY_WINDOW", 5),
                upsert_batch_size: parse_env_or("VECTOR_UPSERT_BATCH_SIZE", 50),
            },
            gateway: GatewayConfig {
                base_url: env_first(&["IPFS_GATEWAY", "NEXT_PUBLIC_IPFS_GATEWAY"])
                    .unwrap_or_else(|| "https://gateway.pinata.cloud".to_string()),
                timeout_secs: parse_env_or("IPFS_GATEWAY_TIMEOUT", 10),
            },
            persona: PersonaConfig {
                key_prefix: env::var("PERSONA_KEY_PREFIX")
                    .unwrap_or_else(|_| crate::models::DEFAULT_PERSONA_PREFIX.to_string()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known providers that expose OpenAI-compatible APIs
pub const KNOWN_PROVIDERS: &[&str] = &["gemini", "openai", "openrouter", "ollama", "lmstudio", "local"];

/// Parse a model name into (provider, model) tuple.
///
/// Names without a known provider prefix are treated as local models.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

/// Provider-specific default base URLs for OpenAI-compatible endpoints
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "gemini" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Whether a hosted provider refuses requests without an API key.
pub fn provider_requires_api_key(provider: &str) -> bool {
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "lmstudio" | "local"
    )
}
