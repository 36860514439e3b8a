use std::fmt;

use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use super::{Metadata, PersonaKey};

/// A file received in an ingestion request. Discarded after extraction.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_pdf(&self) -> bool {
        self.name.to_lowercase().ends_with(".pdf")
            || self
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.eq_ignore_ascii_case("application/pdf"))
    }
}

/// SHA-256 of a file's raw bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One slice of extracted text, scoped to a persona. Maps to exactly one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub source: String,
    pub persona_key: PersonaKey,
    pub content: String,
    pub chunk_hash: Option<String>,
    pub position: usize,
}

/// Persisted chunk row: text, embedding and scope metadata. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub persona_key: PersonaKey,
    pub source: String,
    pub content: String,
    pub chunk_hash: Option<String>,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl VectorRecord {
    pub fn from_chunk(chunk: DocumentChunk, embedding: Vec<f32>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), serde_json::json!(chunk.source));
        metadata.insert(
            "persona_key".to_string(),
            serde_json::json!(chunk.persona_key.as_str()),
        );
        metadata.insert(
            "token_id".to_string(),
            serde_json::json!(chunk.persona_key.token_id()),
        );
        metadata.insert("position".to_string(), serde_json::json!(chunk.position));

        Self {
            id: nanoid!(),
            persona_key: chunk.persona_key,
            source: chunk.source,
            content: chunk.content,
            chunk_hash: chunk.chunk_hash,
            metadata,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub persona_key: String,
    pub source: String,
    pub content: String,
    pub chunk_hash: Option<String>,
    pub score: f32,
}

/// Ledger row that marks a file's bytes as already ingested for a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub persona_key: PersonaKey,
    pub fingerprint: ContentFingerprint,
    pub source: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub model: String,
    pub embedding_dim: usize,
}

/// A file's ledger row and the vectors produced from it. Stored together or not at all.
#[derive(Debug, Clone)]
pub struct FileCommit {
    pub fingerprint: FingerprintRecord,
    pub vectors: Vec<VectorRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub inserted: usize,
    pub files_committed: usize,
    /// Files whose fingerprint another ingestion recorded first. Their vectors were dropped.
    pub already_recorded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub inserted_count: usize,
    pub new_files_processed: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<FileError>,
    /// Set when no file produced any chunk (all duplicate, empty, binary or too small).
    pub nothing_to_process: bool,
}
