//! Dining table handlers

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use shared::error::ErrorCode;
use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate};
use shared::response::ApiResponse;

use super::{ApiResult, RestaurantScope, ValidatedJson, created, verify_restaurant_manager};
use crate::auth::CurrentUser;
use crate::error::{DbResultExt, OptionExt, ServiceResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

async fn load(state: &AppState, id: i64) -> ServiceResult<DiningTable> {
    state
        .repos
        .tables
        .find_by_id(id)
        .await?
        .or_missing(ErrorCode::TableNotFound)
}

/// GET /tables?restaurantId=
pub async fn list(
    State(state): State<AppState>,
    Query(scope): Query<RestaurantScope>,
) -> ApiResult<Vec<DiningTable>> {
    let tables = state.repos.tables.list_by_restaurant(scope.restaurant_id).await?;
    Ok(ApiResponse::ok(tables))
}

/// GET /tables/{id}
pub async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<DiningTable> {
    Ok(ApiResponse::ok(load(&state, id).await?))
}

/// POST /tables
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<DiningTableCreate>,
) -> ServiceResult<impl IntoResponse> {
    verify_restaurant_manager(&state, &user, req.restaurant_id).await?;
    let table = state
        .repos
        .tables
        .create(req)
        .await
        .on_conflict(ErrorCode::TableNumberExists)?;
    tracing::info!(table_id = table.id, restaurant_id = table.restaurant_id, number = %table.number, "Table created");
    Ok(created(table, "Table created"))
}

/// PUT /tables/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<DiningTableUpdate>,
) -> ApiResult<DiningTable> {
    let table = load(&state, id).await?;
    verify_restaurant_manager(&state, &user, table.restaurant_id).await?;
    let table = state
        .repos
        .tables
        .update(id, req)
        .await
        .or_not_found(ErrorCode::TableNotFound)
        .on_conflict(ErrorCode::TableNumberExists)?;
    Ok(ApiResponse::ok_with_message(table, "Table updated"))
}

/// DELETE /tables/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let table = load(&state, id).await?;
    verify_restaurant_manager(&state, &user, table.restaurant_id).await?;
    state
        .repos
        .tables
        .delete(id)
        .await
        .or_not_found(ErrorCode::TableNotFound)?;
    Ok(ApiResponse::message("Table deleted"))
}
