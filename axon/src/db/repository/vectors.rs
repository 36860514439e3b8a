use libsql::{params, Connection};

use crate::error::{AxonError, Result};
use crate::models::{CommitOutcome, FileCommit, ScoredChunk, VectorRecord};

use super::FingerprintRepository;

const COLUMNS_PER_ROW: usize = 9;

pub struct VectorRepository;

impl VectorRepository {
    /// Record each file's fingerprint and insert its vectors inside one
    /// transaction, `batch_size` vector rows per statement.
    ///
    /// Dropping the future before it completes rolls the transaction back, so
    /// a fingerprint is never left behind without its vectors.
    pub async fn commit_files(
        conn: &Connection,
        files: &[FileCommit],
        batch_size: usize,
    ) -> Result<CommitOutcome> {
        if files.is_empty() {
            return Ok(CommitOutcome::default());
        }

        let tx = conn.transaction().await?;
        match Self::write_files(&tx, files, batch_size.max(1)).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(files = files.len(), error = %e, "Ingestion commit failed, rolling back");
                tx.rollback().await.ok();
                Err(e)
            }
        }
    }

    async fn write_files(
        conn: &Connection,
        files: &[FileCommit],
        batch_size: usize,
    ) -> Result<CommitOutcome> {
        let mut outcome = CommitOutcome::default();
        let mut records: Vec<&VectorRecord> = Vec::new();

        for file in files {
            if FingerprintRepository::record(conn, &file.fingerprint).await? {
                outcome.files_committed += 1;
                records.extend(file.vectors.iter());
            } else {
                tracing::debug!(
                    source = %file.fingerprint.source,
                    fingerprint = %file.fingerprint.fingerprint,
                    "Fingerprint recorded by a concurrent ingestion, dropping its vectors"
                );
                outcome.already_recorded += 1;
            }
        }

        for (batch_index, batch) in records.chunks(batch_size).enumerate() {
            let (sql, values) = build_insert(batch)?;
            let rows = conn
                .execute(&sql, libsql::params_from_iter(values))
                .await
                .map_err(|e| {
                    tracing::error!(batch = batch_index, rows = batch.len(), error = %e, "Vector batch insert failed");
                    e
                })?;
            outcome.inserted += rows as usize;
        }

        Ok(outcome)
    }

    pub async fn search_similar(
        conn: &Connection,
        embedding: &[f32],
        persona_key: &str,
        k: u32,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding_json = serde_json::to_string(embedding)?;

        let mut rows = conn
            .query(
                r#"
                SELECT
                    id,
                    persona_key,
                    source,
                    content,
                    chunk_hash,
                    1 - vector_distance_cos(embedding, vector32(?1)) as score
                FROM persona_vectors
                WHERE persona_key = ?2
                ORDER BY score DESC, id ASC
                LIMIT ?3
                "#,
                params![embedding_json, persona_key, k],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(ScoredChunk {
                id: row.get(0)?,
                persona_key: row.get(1)?,
                source: row.get(2)?,
                content: row.get(3)?,
                chunk_hash: row.get(4)?,
                score: row.get::<f64>(5)? as f32,
            });
        }

        Ok(results)
    }

    pub async fn count_by_persona(conn: &Connection, persona_key: &str) -> Result<u64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM persona_vectors WHERE persona_key = ?1",
                params![persona_key],
            )
            .await?;

        Ok(rows
            .next()
            .await?
            .map(|row| row.get::<i64>(0))
            .transpose()?
            .unwrap_or(0) as u64)
    }
}

/// The store rejects text containing NUL bytes.
fn strip_nul(text: &str) -> String {
    text.replace('\0', "")
}

fn build_insert(batch: &[&VectorRecord]) -> Result<(String, Vec<libsql::Value>)> {
    let mut placeholders = Vec::with_capacity(batch.len());
    let mut values = Vec::with_capacity(batch.len() * COLUMNS_PER_ROW);

    for (row, record) in batch.iter().enumerate() {
        let base = row * COLUMNS_PER_ROW;
        placeholders.push(format!(
            "(?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{}, vector32(?{}), ?{})",
            base + 1,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
            base + 6,
            base + 7,
            base + 8,
            base + 9,
        ));

        let metadata = serde_json::to_string(&record.metadata)?;
        let embedding = serde_json::to_string(&record.embedding).map_err(|e| {
            AxonError::Internal(format!("Failed to encode embedding for {}: {e}", record.id))
        })?;

        values.extend([
            libsql::Value::from(record.id.clone()),
            libsql::Value::from(record.persona_key.as_str().to_string()),
            libsql::Value::from(record.persona_key.token_id().to_string()),
            libsql::Value::from(strip_nul(&record.source)),
            libsql::Value::from(strip_nul(&record.content)),
            record
                .chunk_hash
                .clone()
                .map(libsql::Value::from)
                .unwrap_or(libsql::Value::Null),
            libsql::Value::from(strip_nul(&metadata)),
            libsql::Value::from(embedding),
            libsql::Value::from(record.created_at.to_rfc3339()),
        ]);
    }

    let sql = format!(
        "INSERT INTO persona_vectors (id, persona_key, token_id, source, content, chunk_hash, metadata, embedding, created_at) VALUES {}",
        placeholders.join(", ")
    );

    Ok((sql, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::models::{ContentFingerprint, DocumentChunk, FingerprintRecord, PersonaKey};
    use libsql::Builder;

    async fn conn() -> (libsql::Database, Connection) {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn, 3).await.unwrap();
        (db, conn)
    }

    fn record(key: &str, content: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord::from_chunk(
            DocumentChunk {
                source: "doc.txt".to_string(),
                persona_key: PersonaKey::parse(key).unwrap(),
                content: content.to_string(),
                chunk_hash: None,
                position: 0,
            },
            embedding,
        )
    }

    fn file(key: &str, fp: &str, vectors: Vec<VectorRecord>) -> FileCommit {
        FileCommit {
            fingerprint: FingerprintRecord {
                persona_key: PersonaKey::parse(key).unwrap(),
                fingerprint: ContentFingerprint::from_hex(fp),
                source: format!("{fp}.txt"),
                mime_type: Some("text/plain".to_string()),
                size_bytes: 10,
                model: "test".to_string(),
                embedding_dim: 3,
            },
            vectors,
        }
    }

    #[test]
    fn test_build_insert_numbers_placeholders_per_row() {
        let a = record("persona:1", "a", vec![1.0, 0.0, 0.0]);
        let b = record("persona:1", "b", vec![0.0, 1.0, 0.0]);
        let (sql, values) = build_insert(&[&a, &b]).unwrap();
        assert_eq!(values.len(), 18);
        assert!(sql.contains("vector32(?8)"));
        assert!(sql.contains("vector32(?17), ?18)"));
    }

    #[tokio::test]
    async fn test_insert_strips_nul_bytes() {
        let (_db, conn) = conn().await;
        let rec = record("persona:1", "hello\0world", vec![1.0, 0.0, 0.0]);
        let outcome = VectorRepository::commit_files(&conn, &[file("persona:1", "aa", vec![rec])], 50)
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);

        let mut rows = conn
            .query("SELECT content, token_id FROM persona_vectors", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "helloworld");
        assert_eq!(row.get::<String>(1).unwrap(), "1");
    }

    #[tokio::test]
    async fn test_commit_records_fingerprint_with_vectors() {
        let (_db, conn) = conn().await;
        let records: Vec<_> = (0..7)
            .map(|i| record("persona:1", &format!("chunk {i}"), vec![1.0, i as f32, 0.0]))
            .collect();

        let outcome = VectorRepository::commit_files(&conn, &[file("persona:1", "aa", records)], 3)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CommitOutcome {
                inserted: 7,
                files_committed: 1,
                already_recorded: 0,
            }
        );
        assert_eq!(VectorRepository::count_by_persona(&conn, "persona:1").await.unwrap(), 7);
        assert!(FingerprintRepository::exists(&conn, "persona:1", "aa").await.unwrap());
    }

    #[tokio::test]
    async fn test_already_recorded_file_contributes_no_rows() {
        let (_db, conn) = conn().await;
        let first = file("persona:1", "aa", vec![record("persona:1", "x", vec![1.0, 0.0, 0.0])]);
        VectorRepository::commit_files(&conn, &[first.clone()], 50).await.unwrap();

        let fresh = file("persona:1", "bb", vec![record("persona:1", "y", vec![0.0, 1.0, 0.0])]);
        let outcome = VectorRepository::commit_files(&conn, &[first, fresh], 50)
            .await
            .unwrap();

        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.files_committed, 1);
        assert_eq!(outcome.already_recorded, 1);
        assert_eq!(VectorRepository::count_by_persona(&conn, "persona:1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_vectors_and_fingerprints() {
        let (_db, conn) = conn().await;
        let mut records: Vec<_> = (0..4)
            .map(|i| record("persona:1", &format!("chunk {i}"), vec![1.0, 0.0, 0.0]))
            .collect();
        // wrong dimension in the last batch
        records.push(record("persona:1", "bad", vec![1.0, 0.0]));

        let result =
            VectorRepository::commit_files(&conn, &[file("persona:1", "aa", records)], 2).await;
        assert!(result.is_err());
        assert_eq!(VectorRepository::count_by_persona(&conn, "persona:1").await.unwrap(), 0);
        assert!(!FingerprintRepository::exists(&conn, "persona:1", "aa").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_persona() {
        let (_db, conn) = conn().await;
        let files = vec![
            file("persona:a", "aa", vec![record("persona:a", "alpha fact", vec![1.0, 0.0, 0.0])]),
            file(
                "persona:b",
                "aa",
                vec![
                    record("persona:b", "beta fact", vec![1.0, 0.0, 0.0]),
                    record("persona:b", "beta other", vec![0.9, 0.1, 0.0]),
                ],
            ),
        ];
        VectorRepository::commit_files(&conn, &files, 50).await.unwrap();

        let hits = VectorRepository::search_similar(&conn, &[1.0, 0.0, 0.0], "persona:a", 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "alpha fact");
        assert!(hits.iter().all(|h| h.persona_key == "persona:a"));
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity_and_limits() {
        let (_db, conn) = conn().await;
        let records = vec![
            record("persona:1", "far", vec![0.0, 0.0, 1.0]),
            record("persona:1", "near", vec![1.0, 0.0, 0.0]),
            record("persona:1", "middle", vec![0.7, 0.7, 0.0]),
        ];
        VectorRepository::commit_files(&conn, &[file("persona:1", "aa", records)], 50)
            .await
            .unwrap();

        let hits = VectorRepository::search_similar(&conn, &[1.0, 0.0, 0.0], "persona:1", 2)
            .await
            .unwrap();
        let contents: Vec<_> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["near", "middle"]);
        assert!(hits[0].score >= hits[1].score);
    }
}
