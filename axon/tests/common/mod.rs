// Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use axon::config::{DatabaseConfig, GatewayConfig, ProcessingConfig, RetrievalConfig};
use axon::db::{
    Database, DatabaseBackend, FingerprintStore, LibSqlBackend, MetadataStore, PersonaCacheStore,
    PersonaRecordStore, VectorStore,
};
use axon::embeddings::Embedder;
use axon::gateway::{IpfsGateway, MetadataFetcher};
use axon::llm::ChatModel;
use axon::models::{
    CommitOutcome, ContentFingerprint, FileCommit, PersonaAttributes, PersonaKey, PersonaRecord,
    ScoredChunk,
};
use axon::services::{ChatService, IngestionService, PersonaMetadataCache, RagChain};
use axon::{AxonError, Result};

pub const TEST_DIMENSIONS: usize = 32;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// File-backed libsql database inside `dir`.
pub async fn test_database(dir: &TempDir) -> LibSqlBackend {
    let path = dir.path().join("axon-test.db");
    let config = DatabaseConfig {
        url: format!("file:{}", path.display()),
        auth_token: None,
        local_path: None,
    };
    let db = Database::new(&config, TEST_DIMENSIONS)
        .await
        .expect("open test database");
    LibSqlBackend::new(db)
}

pub fn persona(token_id: &str) -> PersonaKey {
    PersonaKey::from_token_id("persona", token_id).expect("valid persona key")
}

// ---------------------------------------------------------------------------
// Embedder
// ---------------------------------------------------------------------------

/// Bag-of-words hashing embedder. Texts sharing words land close together.
pub struct HashEmbedder {
    dimensions: usize,
    delay: Option<Duration>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: TEST_DIMENSIONS,
            delay: None,
        }
    }

    /// Sleeps before answering `embed_documents`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[0] = 1.0;
            return vector;
        }
        vector.iter().map(|v| v / norm).collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "test/hash-embedder"
    }
}

// ---------------------------------------------------------------------------
// Chat model
// ---------------------------------------------------------------------------

/// Returns a canned reply and keeps every prompt it was sent.
pub struct RecordingChatModel {
    reply: String,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingChatModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps before every completion.
    pub fn with_delay(reply: impl Into<String>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(reply)
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts().pop().expect("model was called")
    }
}

#[async_trait]
impl ChatModel for RecordingChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "test/recording"
    }
}

// ---------------------------------------------------------------------------
// Instrumented backend
// ---------------------------------------------------------------------------

/// Delegates to a real backend while counting lookups and optionally failing
/// vector upserts or fingerprint lookups.
pub struct InstrumentedBackend {
    inner: LibSqlBackend,
    record_lookups: AtomicUsize,
    fingerprint_lookups: AtomicUsize,
    fail_upserts: AtomicBool,
    fail_fingerprint_lookup_at: AtomicUsize,
}

impl InstrumentedBackend {
    pub fn new(inner: LibSqlBackend) -> Self {
        Self {
            inner,
            record_lookups: AtomicUsize::new(0),
            fingerprint_lookups: AtomicUsize::new(0),
            fail_upserts: AtomicBool::new(false),
            fail_fingerprint_lookup_at: AtomicUsize::new(0),
        }
    }

    /// Make the `n`th fingerprint lookup from now fail (1-based). `0` disables it.
    pub fn fail_fingerprint_lookup_at(&self, n: usize) {
        self.fingerprint_lookups.store(0, Ordering::SeqCst);
        self.fail_fingerprint_lookup_at.store(n, Ordering::SeqCst);
    }

    pub fn record_lookups(&self) -> usize {
        self.record_lookups.load(Ordering::SeqCst)
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorStore for InstrumentedBackend {
    async fn upsert_vectors(
        &self,
        files: &[FileCommit],
        batch_size: usize,
    ) -> Result<CommitOutcome> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(AxonError::Internal("injected upsert failure".to_string()));
        }
        self.inner.upsert_vectors(files, batch_size).await
    }

    async fn search_similar(
        &self,
        embedding: &[f32],
        persona_key: &PersonaKey,
        k: u32,
    ) -> Result<Vec<ScoredChunk>> {
        self.inner.search_similar(embedding, persona_key, k).await
    }

    async fn count_vectors(&self, persona_key: &PersonaKey) -> Result<u64> {
        self.inner.count_vectors(persona_key).await
    }
}

#[async_trait]
impl FingerprintStore for InstrumentedBackend {
    async fn fingerprint_exists(
        &self,
        persona_key: &PersonaKey,
        fingerprint: &ContentFingerprint,
    ) -> Result<bool> {
        let call = self.fingerprint_lookups.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_fingerprint_lookup_at.load(Ordering::SeqCst) {
            return Err(AxonError::Internal("injected lookup failure".to_string()));
        }
        self.inner.fingerprint_exists(persona_key, fingerprint).await
    }
}

#[async_trait]
impl PersonaRecordStore for InstrumentedBackend {
    async fn get_persona_record(&self, token_id: &str) -> Result<Option<PersonaRecord>> {
        self.record_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_persona_record(token_id).await
    }

    async fn upsert_persona_record(&self, record: &PersonaRecord) -> Result<()> {
        self.inner.upsert_persona_record(record).await
    }
}

#[async_trait]
impl PersonaCacheStore for InstrumentedBackend {
    async fn get_cached_attributes(
        &self,
        persona_key: &PersonaKey,
    ) -> Result<Option<PersonaAttributes>> {
        self.inner.get_cached_attributes(persona_key).await
    }

    async fn insert_cached_attributes(
        &self,
        persona_key: &PersonaKey,
        attributes: &PersonaAttributes,
    ) -> Result<()> {
        self.inner
            .insert_cached_attributes(persona_key, attributes)
            .await
    }

    async fn invalidate_cached_attributes(&self, persona_key: &PersonaKey) -> Result<bool> {
        self.inner.invalidate_cached_attributes(persona_key).await
    }
}

#[async_trait]
impl MetadataStore for InstrumentedBackend {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
        self.inner.get_embedding_dimensions().await
    }

    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
        self.inner.set_embedding_dimensions(dims).await
    }
}

#[async_trait]
impl DatabaseBackend for InstrumentedBackend {
    async fn sync(&self) -> Result<()> {
        self.inner.sync().await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub fn gateway_for(server: &MockServer) -> IpfsGateway {
    IpfsGateway::new(&GatewayConfig {
        base_url: server.uri(),
        timeout_secs: 2,
    })
    .expect("valid gateway url")
}

pub fn teal_metadata() -> serde_json::Value {
    json!({
        "name": "Ada",
        "personalData": {
            "bio": "Painter from Lisbon",
            "background": "Studied fine arts",
            "interests": ["color theory", "sailing"],
            "goals": "open a studio, travel",
            "personalityTraits": ["curious", "warm"]
        }
    })
}

/// Serve `document` at `/ipfs/{cid}` and expect exactly `hits` requests.
pub async fn mount_metadata(server: &MockServer, cid: &str, document: serde_json::Value, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{cid}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .expect(hits)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Assembled pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    pub dir: TempDir,
    pub backend: Arc<InstrumentedBackend>,
    pub model: Arc<RecordingChatModel>,
    pub ingestion: IngestionService,
    pub personas: PersonaMetadataCache,
    pub chat: ChatService,
}

impl Pipeline {
    pub async fn new(server: &MockServer, reply: &str) -> Self {
        Self::with_embedder(server, reply, HashEmbedder::new()).await
    }

    pub async fn with_embedder(server: &MockServer, reply: &str, embedder: HashEmbedder) -> Self {
        init_test_logger();

        let dir = TempDir::new().expect("tempdir");
        let backend = Arc::new(InstrumentedBackend::new(test_database(&dir).await));
        let model = Arc::new(RecordingChatModel::new(reply));

        let db: Arc<dyn DatabaseBackend> = backend.clone();
        let embeddings: Arc<dyn Embedder> = Arc::new(embedder);
        let llm: Arc<dyn ChatModel> = model.clone();
        let fetcher: Arc<dyn MetadataFetcher> = Arc::new(gateway_for(server));

        let retrieval = RetrievalConfig::default();
        let personas = PersonaMetadataCache::new(db.clone(), fetcher);
        let rag = RagChain::new(
            db.clone(),
            personas.clone(),
            embeddings.clone(),
            llm,
            &retrieval,
        );
        let ingestion =
            IngestionService::new(db, embeddings, &ProcessingConfig::default(), &retrieval);

        Self {
            dir,
            backend,
            model,
            ingestion,
            personas,
            chat: ChatService::new(rag),
        }
    }

    pub async fn register_persona(&self, token_id: &str, cid: &str) {
        self.backend
            .upsert_persona_record(&PersonaRecord::new(token_id, format!("ipfs://{cid}")))
            .await
            .expect("store persona record");
    }
}
