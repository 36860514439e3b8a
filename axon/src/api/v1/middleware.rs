//! Whole-request time budget for v1 routes.
//!
//! Runs the rest of the stack under `request_timeout_secs`. When the budget
//! runs out the handler future is dropped and the client receives the v1
//! `ApiResponse` envelope with a `timeout` code instead of an empty body.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;

use super::response::{ApiResponse, ErrorCode};

pub async fn request_timeout_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let budget = Duration::from_secs(state.config.server.request_timeout_secs);
    let method = request.method().clone();
    let uri = request.uri().clone();

    match tokio::time::timeout(budget, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                method = %method,
                uri = %uri,
                budget_secs = budget.as_secs(),
                "Request exceeded its time budget"
            );
            ApiResponse::<()>::error(
                ErrorCode::Timeout,
                format!("Request did not complete within {}s", budget.as_secs()),
            )
            .into_response()
        }
    }
}
