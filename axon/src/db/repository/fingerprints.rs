use chrono::Utc;
use libsql::{params, Connection};
use nanoid::nanoid;

use crate::error::Result;
use crate::models::FingerprintRecord;

pub struct FingerprintRepository;

impl FingerprintRepository {
    pub async fn exists(conn: &Connection, persona_key: &str, fingerprint: &str) -> Result<bool> {
        let mut rows = conn
            .query(
                "SELECT 1 FROM persona_fingerprints WHERE persona_key = ?1 AND fingerprint = ?2 LIMIT 1",
                params![persona_key, fingerprint],
            )
            .await?;

        Ok(rows.next().await?.is_some())
    }

    /// `INSERT OR IGNORE` against the (persona_key, fingerprint) unique key.
    /// Returns `false` when the bytes were already recorded for the persona.
    pub async fn record(conn: &Connection, record: &FingerprintRecord) -> Result<bool> {
        let inserted = conn
            .execute(
                r#"
                INSERT OR IGNORE INTO persona_fingerprints (
                    id, persona_key, token_id, fingerprint, source, mime_type,
                    size_bytes, model, embedding_dim, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    nanoid!(),
                    record.persona_key.as_str(),
                    record.persona_key.token_id(),
                    record.fingerprint.as_str(),
                    record.source.replace('\0', ""),
                    record.mime_type.clone(),
                    record.size_bytes as i64,
                    record.model.clone(),
                    record.embedding_dim as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .await?;

        Ok(inserted > 0)
    }
}
