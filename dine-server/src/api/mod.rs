//! HTTP API
//!
//! ```text
//! /health                       public
//! /ws                           WebSocket notifications
//! {prefix}/{version}/auth       register, login, logout, me
//! {prefix}/{version}/restaurants
//! {prefix}/{version}/menus
//! {prefix}/{version}/tables
//! {prefix}/{version}/orders
//! {prefix}/{version}/users
//! {prefix}/{version}/realtime   connection stats (admin)
//! ```

pub mod auth;
pub mod extract;
pub mod health;
pub mod menus;
pub mod middleware;
pub mod orders;
pub mod restaurants;
pub mod tables;
pub mod users;
pub mod ws;

use axum::routing::get;
use axum::{Router, middleware as axum_middleware};
use http::{HeaderName, HeaderValue, Method, StatusCode, header};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::Restaurant;
use shared::response::ApiResponse;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::CurrentUser;
use crate::auth::rate_limit::api_rate_limit;
use crate::config::Config;
use crate::error::{OptionExt, ServiceResult};
use crate::state::AppState;

pub use extract::{JsonBody, ValidatedJson};

pub type ApiResult<T> = ServiceResult<ApiResponse<T>>;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// `?restaurantId=` scope for list endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantScope {
    pub restaurant_id: i64,
}

/// 201 with the success envelope
pub fn created<T>(data: T, message: &str) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ApiResponse::ok_with_message(data, message))
}

/// Load a restaurant and require the caller to manage it
pub async fn verify_restaurant_manager(
    state: &AppState,
    user: &CurrentUser,
    restaurant_id: i64,
) -> ServiceResult<Restaurant> {
    let restaurant = state
        .repos
        .restaurants
        .find_by_id(restaurant_id)
        .await?
        .or_missing(ErrorCode::RestaurantNotFound)?;
    user.ensure_manager(&restaurant)?;
    Ok(restaurant)
}

async fn route_not_found() -> AppError {
    AppError::with_message(ErrorCode::NotFound, "Route not found")
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, REQUEST_ID]);

    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Versioned REST routes, without the shared middleware stack
pub fn api_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/restaurants", restaurants::router())
        .nest("/menus", menus::router())
        .nest("/tables", tables::router())
        .nest("/orders", orders::router())
        .nest("/users", users::router())
        .route("/realtime/stats", get(ws::connection_stats))
}

/// Fully configured application with all middleware and state
pub fn create_router(state: AppState) -> Router {
    let api = api_router(&state).layer(axum_middleware::from_fn_with_state(
        state.clone(),
        api_rate_limit,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ws", get(ws::ws_handler))
        .nest(&state.config.api_base_path(), api)
        .fallback(route_not_found)
        // Error envelope - innermost, sees raw handler and rejection responses
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_envelope,
        ))
        .layer(CompressionLayer::new())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
        .with_state(state)
}
