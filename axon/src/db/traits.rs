use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    CommitOutcome, ContentFingerprint, FileCommit, PersonaAttributes, PersonaKey, PersonaRecord,
    ScoredChunk,
};

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------

/// Embedded chunk rows and persona-scoped similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Record each file's fingerprint and insert its vectors in one
    /// transaction, `batch_size` vector rows per statement. A file whose
    /// fingerprint is already recorded contributes no rows. Either everything
    /// is committed or nothing is.
    async fn upsert_vectors(&self, files: &[FileCommit], batch_size: usize)
        -> Result<CommitOutcome>;

    /// Up to `k` chunks for `persona_key`, best match first. Rows of other
    /// personas are excluded by the query itself.
    async fn search_similar(
        &self,
        embedding: &[f32],
        persona_key: &PersonaKey,
        k: u32,
    ) -> Result<Vec<ScoredChunk>>;

    async fn count_vectors(&self, persona_key: &PersonaKey) -> Result<u64>;
}

/// Ledger of file fingerprints already ingested per persona. Rows are only
/// written by [`VectorStore::upsert_vectors`], alongside the file's vectors.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn fingerprint_exists(
        &self,
        persona_key: &PersonaKey,
        fingerprint: &ContentFingerprint,
    ) -> Result<bool>;
}

/// Durable token id to metadata location records.
#[async_trait]
pub trait PersonaRecordStore: Send + Sync {
    async fn get_persona_record(&self, token_id: &str) -> Result<Option<PersonaRecord>>;
    async fn upsert_persona_record(&self, record: &PersonaRecord) -> Result<()>;
}

/// Insert-once cache of resolved persona attributes.
#[async_trait]
pub trait PersonaCacheStore: Send + Sync {
    async fn get_cached_attributes(
        &self,
        persona_key: &PersonaKey,
    ) -> Result<Option<PersonaAttributes>>;

    /// Store a snapshot. An existing row for the key is left untouched.
    async fn insert_cached_attributes(
        &self,
        persona_key: &PersonaKey,
        attributes: &PersonaAttributes,
    ) -> Result<()>;

    async fn invalidate_cached_attributes(&self, persona_key: &PersonaKey) -> Result<bool>;
}

/// Key-value metadata store (e.g. embedding dimensions).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>>;
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// A complete database backend that combines all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend:
    VectorStore + FingerprintStore + PersonaRecordStore + PersonaCacheStore + MetadataStore
{
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}
