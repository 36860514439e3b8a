mod chat;
mod ingestion;
mod persona_cache;
mod rag;

pub use chat::ChatService;
pub use ingestion::IngestionService;
pub use persona_cache::PersonaMetadataCache;
pub use rag::{recent_turns, RagChain};
