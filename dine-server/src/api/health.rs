//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    environment: String,
    api_version: String,
    uptime_seconds: u64,
    realtime: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "dine-server",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        api_version: state.config.api_version.clone(),
        uptime_seconds: state.uptime_secs(),
        realtime: state.notifier.is_enabled(),
    })
}
