use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::embeddings::Embedder;
use crate::gateway::MetadataFetcher;
use crate::llm::ChatModel;
use crate::services::{ChatService, IngestionService, PersonaMetadataCache, RagChain};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub embeddings: Arc<dyn Embedder>,
    pub llm: Arc<dyn ChatModel>,
    pub personas: PersonaMetadataCache,
    pub chat: ChatService,
    pub ingestion: IngestionService,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        embeddings: Arc<dyn Embedder>,
        llm: Arc<dyn ChatModel>,
        fetcher: Arc<dyn MetadataFetcher>,
    ) -> Self {
        let config = Arc::new(config);
        let personas = PersonaMetadataCache::new(db.clone(), fetcher);
        let rag = RagChain::new(
            db.clone(),
            personas.clone(),
            embeddings.clone(),
            llm.clone(),
            &config.retrieval,
        );
        let chat = ChatService::new(rag);
        let ingestion = IngestionService::new(
            db.clone(),
            embeddings.clone(),
            &config.processing,
            &config.retrieval,
        );

        Self {
            config,
            db,
            embeddings,
            llm,
            personas,
            chat,
            ingestion,
        }
    }
}
