use axum::extract::{Path, State};

use crate::api::v1::dto::InvalidateCacheResponse;
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;
use crate::models::PersonaKey;

/// `DELETE /api/v1/personas/{tokenId}/cache`
///
/// Drops the cached persona attributes so the next chat re-reads the
/// persona's metadata document.
#[utoipa::path(
    delete,
    path = "/api/v1/personas/{tokenId}/cache",
    tag = "personas",
    operation_id = "personas.invalidateCache",
    params(("tokenId" = String, Path, description = "Persona token id")),
    responses(
        (status = 200, description = "Cache entry removed or absent", body = InvalidateCacheResponse),
        (status = 400, description = "Invalid token id", body = ApiError),
    )
)]
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> ApiResponse<InvalidateCacheResponse> {
    let persona_key = match PersonaKey::from_token_id(&state.config.persona.key_prefix, &token_id)
    {
        Ok(key) => key,
        Err(e) => return e.into(),
    };

    match state.personas.invalidate(&persona_key).await {
        Ok(invalidated) => ApiResponse::success(InvalidateCacheResponse {
            invalidated,
            persona_key: persona_key.to_string(),
        }),
        Err(e) => e.into(),
    }
}
