//! Order handlers

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use serde::Deserialize;
use shared::error::ErrorCode;
use shared::models::{Order, OrderCreate, OrderStatus, OrderStatusUpdate};
use shared::request::Page;
use shared::response::{ApiResponse, Paginated};

use super::{ApiResult, JsonBody, ValidatedJson, created, verify_restaurant_manager};
use crate::auth::CurrentUser;
use crate::db::OrderFilter;
use crate::error::{OptionExt, ServiceResult};
use crate::orders;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/cancel", post(cancel))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Manager view of one restaurant; without it the caller's own orders
    pub restaurant_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// POST /orders
pub async fn create(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    ValidatedJson(req): ValidatedJson<OrderCreate>,
) -> ServiceResult<impl IntoResponse> {
    let order = orders::place_order(&state, user.as_ref(), req).await?;
    Ok(created(order, "Order placed"))
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Paginated<Order>> {
    let page = Page::new(query.page, query.limit);
    let filter = match query.restaurant_id {
        Some(restaurant_id) => {
            verify_restaurant_manager(&state, &user, restaurant_id).await?;
            OrderFilter {
                restaurant_id: Some(restaurant_id),
                customer_id: None,
                status: query.status,
            }
        }
        None => OrderFilter {
            restaurant_id: None,
            customer_id: Some(user.id),
            status: query.status,
        },
    };
    let (items, total) = state.repos.orders.list(filter, page.into()).await?;
    Ok(ApiResponse::ok(Paginated::new(items, page.page, page.limit, total)))
}

/// GET /orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    let order = state
        .repos
        .orders
        .find_by_id(id)
        .await?
        .or_missing(ErrorCode::OrderNotFound)?;
    orders::ensure_can_view(&state, &user, &order).await?;
    Ok(ApiResponse::ok(order))
}

/// PATCH /orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<OrderStatusUpdate>,
) -> ApiResult<Order> {
    let order = orders::change_status(&state, &user, id, req.status).await?;
    Ok(ApiResponse::ok_with_message(order, "Order status updated"))
}

/// POST /orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Order> {
    let order = orders::cancel_order(&state, &user, id).await?;
    Ok(ApiResponse::ok_with_message(order, "Order cancelled"))
}
