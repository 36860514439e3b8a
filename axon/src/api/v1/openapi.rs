use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Axon API",
        version = "1.0.0",
        description = "Persona retrieval-augmented chat: ingest persona documents and chat in the persona's voice.",
    ),
    paths(
        handlers::health::health_check,
        handlers::chat::chat,
        handlers::chat::chat_stream,
        handlers::ingest::ingest,
        handlers::personas::invalidate_cache,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Chat
        dto::chat::ChatRequestDto,
        dto::chat::ChatMessageDto,
        dto::chat::MessagePartDto,
        dto::chat::ChatResponseDto,
        // Ingestion
        dto::ingest::IngestResponse,
        dto::ingest::FileErrorDto,
        dto::ingest::InvalidateCacheResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "chat", description = "Persona chat, full response or streamed"),
        (name = "ingest", description = "Persona document ingestion"),
        (name = "personas", description = "Persona metadata cache control"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
