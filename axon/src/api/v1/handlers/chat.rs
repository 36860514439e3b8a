//! v1 persona chat handlers.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{ChatRequestDto, ChatResponseDto};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/chat`
///
/// Answers a question in the persona's voice, grounded on the persona's
/// ingested documents.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    operation_id = "chat.answer",
    request_body = ChatRequestDto,
    responses(
        (status = 200, description = "Persona answer", body = ChatResponseDto),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Persona token not found", body = ApiError),
        (status = 429, description = "Upstream rate limit", body = ApiError),
        (status = 502, description = "Content gateway or provider failure", body = ApiError),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    AppJson(req): AppJson<ChatRequestDto>,
) -> ApiResponse<ChatResponseDto> {
    let request = match req.into_request(&state.config.persona.key_prefix) {
        Ok(request) => request,
        Err(e) => return e.into(),
    };

    match state.chat.chat(&request).await {
        Ok(response) if response.answer.trim().is_empty() => {
            tracing::warn!(persona_key = %request.persona_key, "Empty response from chat model");
            ApiResponse::error(ErrorCode::UpstreamError, "No response from the model")
        }
        Ok(response) => ApiResponse::success(ChatResponseDto {
            answer: response.answer,
            persona_key: request.persona_key.to_string(),
        }),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/chat:stream`
///
/// Same request as `/chat`. Answers with server-sent events: one `data`
/// event per text delta, then `event: done`. A failure after the stream has
/// started is reported as `event: error`.
#[utoipa::path(
    post,
    path = "/api/v1/chat:stream",
    tag = "chat",
    operation_id = "chat.stream",
    request_body = ChatRequestDto,
    responses(
        (status = 200, description = "Server-sent text deltas", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Persona token not found", body = ApiError),
    )
)]
pub async fn chat_stream(
    State(state): State<AppState>,
    AppJson(req): AppJson<ChatRequestDto>,
) -> Response {
    let request = match req.into_request(&state.config.persona.key_prefix) {
        Ok(request) => request,
        Err(e) => return ApiResponse::<()>::from(e).into_response(),
    };

    let mut deltas = match state.chat.chat_stream(&request).await {
        Ok(deltas) => deltas,
        Err(e) => return ApiResponse::<()>::from(e).into_response(),
    };

    let persona_key = request.persona_key.clone();
    let events = async_stream::stream! {
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) => yield Ok::<_, Infallible>(Event::default().data(text)),
                Err(e) => {
                    tracing::error!(persona_key = %persona_key, error = %e, "Chat stream failed");
                    let code = ApiResponse::<()>::from(e)
                        .error
                        .map(|err| err.code)
                        .unwrap_or(ErrorCode::InternalError);
                    yield Ok(Event::default().event("error").data(code.to_string()));
                    return;
                }
            }
        }
        yield Ok(Event::default().event("done").data(""));
    };

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
