//! v1 document ingestion handler.

use axum::extract::{Multipart, State};

use crate::api::v1::dto::common::resolve_persona_key;
use crate::api::v1::dto::IngestResponse;
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::UploadedFile;

/// `POST /api/v1/ingest`
///
/// Multipart upload of one or more `files` for a persona named by `tokenId`
/// or `personaKey`. Files already ingested for the persona are skipped.
#[utoipa::path(
    post,
    path = "/api/v1/ingest",
    tag = "ingest",
    operation_id = "ingest.files",
    request_body(content_type = "multipart/form-data", description = "files[] plus tokenId or personaKey"),
    responses(
        (status = 200, description = "Ingestion result", body = IngestResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 429, description = "Embedding provider rate limit", body = ApiError),
        (status = 502, description = "Embedding provider failure", body = ApiError),
    )
)]
pub async fn ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<IngestResponse> {
    let mut files = Vec::new();
    let mut token_id: Option<String> = None;
    let mut persona_key: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Invalid multipart body: {e}"),
                );
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" | "files[]" | "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);

                let bytes = match field.bytes().await {
                    Ok(b) => b,
                    Err(e) => {
                        return ApiResponse::error(
                            ErrorCode::InvalidRequest,
                            format!("Failed to read file {file_name}: {e}"),
                        );
                    }
                };

                files.push(UploadedFile::new(file_name, content_type, bytes.to_vec()));
            }
            "tokenId" | "token_id" => match field.text().await {
                Ok(t) => token_id = Some(t),
                Err(e) => {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        format!("Invalid tokenId: {e}"),
                    );
                }
            },
            "personaKey" | "persona_key" => match field.text().await {
                Ok(t) => persona_key = Some(t),
                Err(e) => {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        format!("Invalid personaKey: {e}"),
                    );
                }
            },
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let persona_key = match resolve_persona_key(
        &state.config.persona.key_prefix,
        token_id.as_deref(),
        persona_key.as_deref(),
    ) {
        Ok(key) => key,
        Err(e) => return e.into(),
    };

    if files.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "At least one file is required");
    }

    tracing::info!(persona_key = %persona_key, files = files.len(), "Ingest request");

    match state.ingestion.ingest(files, &persona_key).await {
        Ok(report) => ApiResponse::success(IngestResponse::from_report(
            report,
            persona_key.to_string(),
        )),
        Err(e) => e.into(),
    }
}
