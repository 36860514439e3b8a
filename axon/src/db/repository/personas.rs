use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{PersonaAttributes, PersonaRecord};

pub struct PersonaRepository;

impl PersonaRepository {
    pub async fn get_by_token_id(conn: &Connection, token_id: &str) -> Result<Option<PersonaRecord>> {
        let mut rows = conn
            .query(
                r#"
                SELECT token_id, name, description, metadata_uri, image_cid, wallet_address
                FROM persona_records
                WHERE token_id = ?1
                "#,
                params![token_id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        Ok(Some(PersonaRecord {
            token_id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            metadata_uri: row.get(3)?,
            image_cid: row.get(4)?,
            wallet_address: row.get(5)?,
        }))
    }

    pub async fn upsert(conn: &Connection, record: &PersonaRecord) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO persona_records (
                token_id, name, description, metadata_uri, image_cid, wallet_address, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(token_id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                metadata_uri = excluded.metadata_uri,
                image_cid = excluded.image_cid,
                wallet_address = excluded.wallet_address
            "#,
            params![
                record.token_id.clone(),
                record.name.clone(),
                record.description.clone(),
                record.metadata_uri.clone(),
                record.image_cid.clone(),
                record.wallet_address.clone(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }
}

pub struct PersonaCacheRepository;

impl PersonaCacheRepository {
    pub async fn get(conn: &Connection, persona_key: &str) -> Result<Option<PersonaAttributes>> {
        let mut rows = conn
            .query(
                "SELECT data FROM persona_metadata_cache WHERE persona_key = ?1",
                params![persona_key],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(serde_json::from_str(&row.get::<String>(0)?)?)),
            None => Ok(None),
        }
    }

    /// First writer wins; later inserts for the same key are ignored.
    pub async fn insert(
        conn: &Connection,
        persona_key: &str,
        attributes: &PersonaAttributes,
    ) -> Result<()> {
        let data = serde_json::to_string(attributes)?;
        conn.execute(
            "INSERT OR IGNORE INTO persona_metadata_cache (persona_key, data, cached_at) VALUES (?1, ?2, ?3)",
            params![persona_key, data, Utc::now().to_rfc3339()],
        )
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &Connection, persona_key: &str) -> Result<bool> {
        let deleted = conn
            .execute(
                "DELETE FROM persona_metadata_cache WHERE persona_key = ?1",
                params![persona_key],
            )
            .await?;
        Ok(deleted > 0)
    }
}
