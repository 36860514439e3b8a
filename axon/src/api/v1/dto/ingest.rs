//! Ingestion and persona cache DTOs for the v1 API.

use serde::Serialize;

use crate::models::{FileError, IngestReport};

pub const NOTHING_TO_PROCESS_MESSAGE: &str = "No new files to process.";

/// Response for `POST /v1/ingest`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    /// Chunks embedded and stored by this call.
    pub inserted_count: usize,
    /// Files that were new for the persona and read successfully.
    pub new_files_processed: usize,
    /// Files whose bytes were already ingested for the persona.
    pub skipped_duplicates: usize,
    /// Per-file read failures. These files were dropped.
    pub errors: Vec<FileErrorDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub persona_key: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FileErrorDto {
    pub file: String,
    pub message: String,
}

impl From<FileError> for FileErrorDto {
    fn from(err: FileError) -> Self {
        Self {
            file: err.file,
            message: err.message,
        }
    }
}

impl IngestResponse {
    pub fn from_report(report: IngestReport, persona_key: String) -> Self {
        Self {
            success: true,
            inserted_count: report.inserted_count,
            new_files_processed: report.new_files_processed,
            skipped_duplicates: report.skipped_duplicates,
            errors: report.errors.into_iter().map(Into::into).collect(),
            message: report
                .nothing_to_process
                .then(|| NOTHING_TO_PROCESS_MESSAGE.to_string()),
            persona_key,
        }
    }
}

/// Response for `DELETE /v1/personas/{tokenId}/cache`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateCacheResponse {
    /// `false` when nothing was cached for the persona.
    pub invalidated: bool,
    pub persona_key: String,
}
