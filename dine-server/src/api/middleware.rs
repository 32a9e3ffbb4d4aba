//! Request logging and the error envelope

use axum::body::Body;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::HeaderValue;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use shared::error::{AppError, ErrorEnvelope};
use std::time::Instant;
use tracing::{info, warn};

use crate::state::AppState;

/// Largest non-JSON error body folded into the envelope message
const MAX_ERROR_BODY: usize = 16 * 1024;

/// Log every request with method, matched path, status and latency
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    if response.status().is_server_error() {
        warn!(request_id = %request_id, method = %method, path = %path, status, latency_ms, "Request failed");
    } else {
        info!(request_id = %request_id, method = %method, path = %path, status, latency_ms, "Request completed");
    }
    response
}

/// Rewrite every error response into the JSON envelope
///
/// Handler errors carry their `AppError` in the response extensions; other
/// failures (extractor rejections, unmatched routes, 405) are wrapped from
/// their status and plain-text body. Details are only exposed in development.
pub async fn error_envelope(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let error = match parts.extensions.remove::<AppError>() {
        Some(error) => error,
        None => {
            let bytes = axum::body::to_bytes(body, MAX_ERROR_BODY)
                .await
                .unwrap_or_default();
            AppError::from_status(status, String::from_utf8_lossy(&bytes).trim())
        }
    };

    let details = if state.config.is_development() {
        error.details.clone()
    } else {
        None
    };
    let envelope = ErrorEnvelope::from_error(&error, status)
        .with_request(method, path)
        .with_details(details);
    let Ok(body) = serde_json::to_vec(&envelope) else {
        return status.into_response();
    };

    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}
