use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
        .route("/chat", post(handlers::chat::chat))
        .route("/chat:stream", post(handlers::chat::chat_stream))
        .route("/ingest", post(handlers::ingest::ingest))
        .route(
            "/personas/{tokenId}/cache",
            delete(handlers::personas::invalidate_cache),
        )
}
