use libsql::Connection;

use crate::error::Result;

/// Create all tables. `dimensions` sizes the vector column and only applies
/// when `persona_vectors` does not exist yet.
pub async fn init_schema(conn: &Connection, dimensions: usize) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        -- Embedded document chunks, one row per chunk
        CREATE TABLE IF NOT EXISTS persona_vectors (
            id TEXT PRIMARY KEY,
            persona_key TEXT NOT NULL,
            token_id TEXT NOT NULL,
            source TEXT NOT NULL,
            content TEXT NOT NULL,
            chunk_hash TEXT,
            metadata TEXT NOT NULL DEFAULT '{{}}',
            embedding F32_BLOB({dimensions}) NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_persona_vectors_persona_key ON persona_vectors(persona_key);

        -- Ingestion ledger: one row per file content already embedded for a persona
        CREATE TABLE IF NOT EXISTS persona_fingerprints (
            id TEXT PRIMARY KEY,
            persona_key TEXT NOT NULL,
            token_id TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            source TEXT NOT NULL,
            mime_type TEXT,
            size_bytes INTEGER NOT NULL DEFAULT 0,
            model TEXT NOT NULL,
            embedding_dim INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (persona_key, fingerprint)
        );

        -- Durable pointer from token id to the persona's metadata document
        CREATE TABLE IF NOT EXISTS persona_records (
            token_id TEXT PRIMARY KEY,
            name TEXT,
            description TEXT,
            metadata_uri TEXT NOT NULL,
            image_cid TEXT,
            wallet_address TEXT,
            created_at TEXT NOT NULL
        );

        -- Insert-once snapshots of resolved persona attributes
        CREATE TABLE IF NOT EXISTS persona_metadata_cache (
            persona_key TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            cached_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS axon_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#
    ))
    .await?;

    create_vector_index(conn).await?;

    Ok(())
}

async fn create_vector_index(conn: &Connection) -> Result<()> {
    let index_exists = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='persona_vectors_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS persona_vectors_embedding_idx ON persona_vectors(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for persona_vectors: {e}");
        }
    }

    Ok(())
}
