use std::sync::Arc;

use crate::db::DatabaseBackend;
use crate::error::{AxonError, Result};
use crate::gateway::MetadataFetcher;
use crate::models::{PersonaAttributes, PersonaKey};

/// Cache-aside lookup of persona attributes.
///
/// A hit returns the stored snapshot. A miss resolves the persona's durable
/// record, fetches the metadata document it points at and writes the parsed
/// attributes back. Snapshots are never refreshed unless `invalidate` is called.
#[derive(Clone)]
pub struct PersonaMetadataCache {
    db: Arc<dyn DatabaseBackend>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl PersonaMetadataCache {
    pub fn new(db: Arc<dyn DatabaseBackend>, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self { db, fetcher }
    }

    pub async fn get_persona_attributes(&self, persona_key: &PersonaKey) -> Result<PersonaAttributes> {
        if let Some(cached) = self.db.get_cached_attributes(persona_key).await? {
            tracing::debug!(persona_key = %persona_key, "Persona metadata cache hit");
            return Ok(cached);
        }

        tracing::debug!(persona_key = %persona_key, "Persona metadata cache miss");
        let attributes = self.resolve(persona_key).await?;

        if let Err(e) = self
            .db
            .insert_cached_attributes(persona_key, &attributes)
            .await
        {
            tracing::warn!(
                persona_key = %persona_key,
                error = %e,
                "Failed to write persona metadata to cache"
            );
        }

        Ok(attributes)
    }

    /// Drop the cached snapshot so the next lookup resolves it again.
    pub async fn invalidate(&self, persona_key: &PersonaKey) -> Result<bool> {
        let removed = self.db.invalidate_cached_attributes(persona_key).await?;
        tracing::info!(persona_key = %persona_key, removed, "Persona metadata cache invalidated");
        Ok(removed)
    }

    async fn resolve(&self, persona_key: &PersonaKey) -> Result<PersonaAttributes> {
        let token_id = persona_key.token_id();
        let record = self
            .db
            .get_persona_record(token_id)
            .await?
            .ok_or_else(|| AxonError::TokenNotFound(token_id.to_string()))?;

        let document = self.fetcher.fetch_json(&record.metadata_uri).await?;
        PersonaAttributes::from_document(&document)
    }
}
