use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;

use crate::config::{ProcessingConfig, RetrievalConfig};
use crate::db::DatabaseBackend;
use crate::embeddings::Embedder;
use crate::error::{AxonError, Result};
use crate::models::{
    CommitOutcome, DocumentChunk, FileCommit, FileError, FingerprintRecord, IngestReport,
    PersonaKey, UploadedFile, VectorRecord,
};
use crate::processing::{fingerprint, DocumentLoader, TextChunker};

struct NewFile {
    file: UploadedFile,
    record: FingerprintRecord,
}

struct ExtractedFile {
    record: FingerprintRecord,
    chunks: Result<Vec<DocumentChunk>>,
}

/// Turns uploaded files into persona-scoped vector rows.
///
/// Files whose bytes were already ingested for the persona are skipped. A file
/// that cannot be read is reported and dropped without failing the batch.
/// Nothing is written until the final commit, which stores every file's
/// fingerprint and vectors in one transaction. A file that yields no chunks is
/// never recorded, so it can be uploaded again.
#[derive(Clone)]
pub struct IngestionService {
    db: Arc<dyn DatabaseBackend>,
    embeddings: Arc<dyn Embedder>,
    loader: DocumentLoader,
    chunker: TextChunker,
    upsert_batch_size: usize,
}

impl IngestionService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        embeddings: Arc<dyn Embedder>,
        processing: &ProcessingConfig,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            db,
            embeddings,
            loader: DocumentLoader::new(processing),
            chunker: TextChunker::new(processing),
            upsert_batch_size: retrieval.upsert_batch_size.max(1),
        }
    }

    pub async fn ingest(
        &self,
        files: Vec<UploadedFile>,
        persona_key: &PersonaKey,
    ) -> Result<IngestReport> {
        if files.is_empty() {
            return Err(AxonError::Validation("No files provided".to_string()));
        }

        let started = Instant::now();
        let total_files = files.len();
        let mut report = IngestReport::default();

        let new_files = self.select_new_files(files, persona_key, &mut report).await?;
        if new_files.is_empty() {
            tracing::info!(
                persona_key = %persona_key,
                skipped = report.skipped_duplicates,
                "No new files to process"
            );
            report.nothing_to_process = true;
            return Ok(report);
        }

        let mut pending = Vec::new();
        for file in self.extract(new_files, persona_key).await {
            match file.chunks {
                Ok(chunks) => {
                    report.new_files_processed += 1;
                    if chunks.is_empty() {
                        tracing::debug!(file = %file.record.source, "File produced no chunks");
                    } else {
                        pending.push((file.record, chunks));
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file.record.source, error = %e, "Failed to extract file");
                    report.errors.push(FileError {
                        file: file.record.source,
                        message: e.to_string(),
                    });
                }
            }
        }

        if pending.is_empty() {
            tracing::info!(
                persona_key = %persona_key,
                files = total_files,
                "No valid text content found in files after processing"
            );
            report.nothing_to_process = true;
            return Ok(report);
        }

        let outcome = self.embed_and_store(pending).await.map_err(|e| {
            tracing::error!(persona_key = %persona_key, error = %e, "Ingestion failed, nothing stored");
            e
        })?;

        report.inserted_count = outcome.inserted;
        report.skipped_duplicates += outcome.already_recorded;
        report.new_files_processed = report
            .new_files_processed
            .saturating_sub(outcome.already_recorded);
        report.nothing_to_process = outcome.files_committed == 0;

        tracing::info!(
            persona_key = %persona_key,
            inserted = outcome.inserted,
            files = outcome.files_committed,
            skipped = report.skipped_duplicates,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion complete"
        );
        Ok(report)
    }

    /// Fingerprint every file and keep the ones not yet recorded for the
    /// persona. Repeats within the upload count as duplicates.
    async fn select_new_files(
        &self,
        files: Vec<UploadedFile>,
        persona_key: &PersonaKey,
        report: &mut IngestReport,
    ) -> Result<Vec<NewFile>> {
        let hashed = join_all(files.into_iter().map(|file| {
            tokio::task::spawn_blocking(move || {
                let fingerprint = fingerprint(&file.bytes);
                (file, fingerprint)
            })
        }))
        .await;

        let mut seen = HashSet::new();
        let mut new_files = Vec::new();
        for joined in hashed {
            let (file, fingerprint) =
                joined.map_err(|e| AxonError::Internal(format!("Fingerprint task failed: {e}")))?;

            if !seen.insert(fingerprint.clone())
                || self
                    .db
                    .fingerprint_exists(persona_key, &fingerprint)
                    .await?
            {
                tracing::debug!(file = %file.name, fingerprint = %fingerprint, "Skipping duplicate file");
                report.skipped_duplicates += 1;
                continue;
            }

            let record = FingerprintRecord {
                persona_key: persona_key.clone(),
                fingerprint,
                source: file.name.clone(),
                mime_type: file.mime_type.clone(),
                size_bytes: file.size() as u64,
                model: self.embeddings.model_name().to_string(),
                embedding_dim: self.embeddings.dimensions(),
            };
            new_files.push(NewFile { file, record });
        }

        Ok(new_files)
    }

    /// Load and chunk each file on the blocking pool, preserving input order.
    async fn extract(&self, new_files: Vec<NewFile>, persona_key: &PersonaKey) -> Vec<ExtractedFile> {
        let tasks = new_files.into_iter().map(|NewFile { file, record }| {
            let loader = self.loader.clone();
            let chunker = self.chunker.clone();
            let persona_key = persona_key.clone();

            async move {
                let joined = tokio::task::spawn_blocking(move || {
                    loader
                        .try_load(&file)
                        .map(|text| chunker.chunk_document(&file.name, &persona_key, &text))
                })
                .await;

                let chunks = joined.unwrap_or_else(|e| {
                    Err(AxonError::Processing(format!("Extraction task failed: {e}")))
                });
                ExtractedFile { record, chunks }
            }
        });

        join_all(tasks).await
    }

    /// Embed every pending chunk in one call, then commit each file's
    /// fingerprint together with its vectors.
    async fn embed_and_store(
        &self,
        pending: Vec<(FingerprintRecord, Vec<DocumentChunk>)>,
    ) -> Result<CommitOutcome> {
        let texts: Vec<String> = pending
            .iter()
            .flat_map(|(_, chunks)| chunks.iter().map(|c| c.content.clone()))
            .collect();
        let expected = texts.len();
        let embeddings = self.embeddings.embed_documents(texts).await?;

        if embeddings.len() != expected {
            return Err(AxonError::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                embeddings.len()
            )));
        }

        let mut embeddings = embeddings.into_iter();
        let files: Vec<FileCommit> = pending
            .into_iter()
            .map(|(fingerprint, chunks)| FileCommit {
                fingerprint,
                vectors: chunks
                    .into_iter()
                    .zip(embeddings.by_ref())
                    .map(|(chunk, embedding)| VectorRecord::from_chunk(chunk, embedding))
                    .collect(),
            })
            .collect();

        tracing::debug!(
            files = files.len(),
            rows = expected,
            batch = self.upsert_batch_size,
            "Upserting vectors"
        );
        self.db.upsert_vectors(&files, self.upsert_batch_size).await
    }
}
