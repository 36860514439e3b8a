use crate::db::connection::Database;
use crate::db::repository::{
    FingerprintRepository, PersonaCacheRepository, PersonaRepository, VectorRepository,
};
use crate::db::traits::{
    DatabaseBackend, FingerprintStore, MetadataStore, PersonaCacheStore, PersonaRecordStore,
    VectorStore,
};
use crate::db::MetadataRepository;
use crate::error::Result;
use crate::models::{
    CommitOutcome, ContentFingerprint, FileCommit, PersonaAttributes, PersonaKey, PersonaRecord,
    ScoredChunk,
};
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl VectorStore for LibSqlBackend {
    async fn upsert_vectors(
        &self,
        files: &[FileCommit],
        batch_size: usize,
    ) -> Result<CommitOutcome> {
        let conn = self.db.connect()?;
        VectorRepository::commit_files(&conn, files, batch_size).await
    }
    async fn search_similar(
        &self,
        embedding: &[f32],
        persona_key: &PersonaKey,
        k: u32,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.db.connect()?;
        VectorRepository::search_similar(&conn, embedding, persona_key.as_str(), k).await
    }
    async fn count_vectors(&self, persona_key: &PersonaKey) -> Result<u64> {
        let conn = self.db.connect()?;
        VectorRepository::count_by_persona(&conn, persona_key.as_str()).await
    }
}

#[async_trait]
impl FingerprintStore for LibSqlBackend {
    async fn fingerprint_exists(
        &self,
        persona_key: &PersonaKey,
        fingerprint: &ContentFingerprint,
    ) -> Result<bool> {
        let conn = self.db.connect()?;
        FingerprintRepository::exists(&conn, persona_key.as_str(), fingerprint.as_str()).await
    }
}

#[async_trait]
impl PersonaRecordStore for LibSqlBackend {
    async fn get_persona_record(&self, token_id: &str) -> Result<Option<PersonaRecord>> {
        let conn = self.db.connect()?;
        PersonaRepository::get_by_token_id(&conn, token_id).await
    }
    async fn upsert_persona_record(&self, record: &PersonaRecord) -> Result<()> {
        let conn = self.db.connect()?;
        PersonaRepository::upsert(&conn, record).await
    }
}

#[async_trait]
impl PersonaCacheStore for LibSqlBackend {
    async fn get_cached_attributes(
        &self,
        persona_key: &PersonaKey,
    ) -> Result<Option<PersonaAttributes>> {
        let conn = self.db.connect()?;
        PersonaCacheRepository::get(&conn, persona_key.as_str()).await
    }
    async fn insert_cached_attributes(
        &self,
        persona_key: &PersonaKey,
        attributes: &PersonaAttributes,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        PersonaCacheRepository::insert(&conn, persona_key.as_str(), attributes).await
    }
    async fn invalidate_cached_attributes(&self, persona_key: &PersonaKey) -> Result<bool> {
        let conn = self.db.connect()?;
        PersonaCacheRepository::delete(&conn, persona_key.as_str()).await
    }
}

#[async_trait]
impl MetadataStore for LibSqlBackend {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
        let conn = self.db.connect()?;
        MetadataRepository::get_embedding_dimensions(&conn).await
    }
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
        let conn = self.db.connect()?;
        MetadataRepository::set_embedding_dimensions(&conn, dims).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.db.connect()?;
        conn.query("SELECT 1", ()).await?.next().await?;
        Ok(())
    }
}
