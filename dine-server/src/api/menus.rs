//! Menu tree handlers
//!
//! Every write resolves the restaurant that owns the touched node and
//! requires the caller to manage it.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use shared::error::ErrorCode;
use shared::models::{
    Category, CategoryCreate, CategoryUpdate, Menu, MenuCreate, MenuDetail, MenuItem,
    MenuItemCreate, MenuItemUpdate, MenuUpdate, Variant, VariantCreate,
};
use shared::response::ApiResponse;

use super::{ApiResult, RestaurantScope, ValidatedJson, created, verify_restaurant_manager};
use crate::auth::CurrentUser;
use crate::db::MenuNode;
use crate::error::{DbResultExt, OptionExt, ServiceResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create_menu))
        .route("/{id}", get(get_menu).put(update_menu).delete(delete_menu))
        .route("/{id}/categories", post(create_category))
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/categories/{id}/items", post(create_item))
        .route("/items/{id}", put(update_item).delete(delete_item))
        .route("/items/{id}/variants", post(create_variant))
        .route("/variants/{id}", delete(delete_variant))
}

fn missing_code(node: MenuNode) -> ErrorCode {
    match node {
        MenuNode::Menu(_) => ErrorCode::MenuNotFound,
        MenuNode::Category(_) => ErrorCode::CategoryNotFound,
        MenuNode::Item(_) => ErrorCode::MenuItemNotFound,
        MenuNode::Variant(_) => ErrorCode::VariantNotFound,
    }
}

/// Require the caller to manage the restaurant owning `node`
async fn authorize_node(state: &AppState, user: &CurrentUser, node: MenuNode) -> ServiceResult<()> {
    let restaurant_id = state
        .repos
        .menus
        .owning_restaurant(node)
        .await?
        .or_missing(missing_code(node))?;
    verify_restaurant_manager(state, user, restaurant_id).await?;
    Ok(())
}

/// GET /menus?restaurantId=
pub async fn list(
    State(state): State<AppState>,
    Query(scope): Query<RestaurantScope>,
) -> ApiResult<Vec<Menu>> {
    let menus = state.repos.menus.list_menus(scope.restaurant_id).await?;
    Ok(ApiResponse::ok(menus))
}

/// GET /menus/{id}
pub async fn get_menu(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<MenuDetail> {
    let detail = state
        .repos
        .menus
        .menu_detail(id)
        .await?
        .or_missing(ErrorCode::MenuNotFound)?;
    Ok(ApiResponse::ok(detail))
}

/// POST /menus
pub async fn create_menu(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<MenuCreate>,
) -> ServiceResult<impl IntoResponse> {
    verify_restaurant_manager(&state, &user, req.restaurant_id).await?;
    let menu = state.repos.menus.create_menu(req).await?;
    tracing::info!(menu_id = menu.id, restaurant_id = menu.restaurant_id, "Menu created");
    Ok(created(menu, "Menu created"))
}

/// PUT /menus/{id}
pub async fn update_menu(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MenuUpdate>,
) -> ApiResult<Menu> {
    authorize_node(&state, &user, MenuNode::Menu(id)).await?;
    let menu = state
        .repos
        .menus
        .update_menu(id, req)
        .await
        .or_not_found(ErrorCode::MenuNotFound)?;
    Ok(ApiResponse::ok_with_message(menu, "Menu updated"))
}

/// DELETE /menus/{id}
pub async fn delete_menu(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    authorize_node(&state, &user, MenuNode::Menu(id)).await?;
    state
        .repos
        .menus
        .delete_menu(id)
        .await
        .or_not_found(ErrorCode::MenuNotFound)?;
    Ok(ApiResponse::message("Menu deleted"))
}

/// POST /menus/{id}/categories
pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(menu_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CategoryCreate>,
) -> ServiceResult<impl IntoResponse> {
    authorize_node(&state, &user, MenuNode::Menu(menu_id)).await?;
    let category = state
        .repos
        .menus
        .create_category(menu_id, req)
        .await
        .or_not_found(ErrorCode::MenuNotFound)?;
    Ok(created(category, "Category created"))
}

/// PUT /menus/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CategoryUpdate>,
) -> ApiResult<Category> {
    authorize_node(&state, &user, MenuNode::Category(id)).await?;
    let category = state
        .repos
        .menus
        .update_category(id, req)
        .await
        .or_not_found(ErrorCode::CategoryNotFound)?;
    Ok(ApiResponse::ok_with_message(category, "Category updated"))
}

/// DELETE /menus/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    authorize_node(&state, &user, MenuNode::Category(id)).await?;
    state
        .repos
        .menus
        .delete_category(id)
        .await
        .or_not_found(ErrorCode::CategoryNotFound)?;
    Ok(ApiResponse::message("Category deleted"))
}

/// POST /menus/categories/{id}/items
pub async fn create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(category_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MenuItemCreate>,
) -> ServiceResult<impl IntoResponse> {
    authorize_node(&state, &user, MenuNode::Category(category_id)).await?;
    let item = state
        .repos
        .menus
        .create_item(category_id, req)
        .await
        .or_not_found(ErrorCode::CategoryNotFound)?;
    Ok(created(item, "Menu item created"))
}

/// PUT /menus/items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MenuItemUpdate>,
) -> ApiResult<MenuItem> {
    authorize_node(&state, &user, MenuNode::Item(id)).await?;
    let item = state
        .repos
        .menus
        .update_item(id, req)
        .await
        .or_not_found(ErrorCode::MenuItemNotFound)?;
    Ok(ApiResponse::ok_with_message(item, "Menu item updated"))
}

/// DELETE /menus/items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    authorize_node(&state, &user, MenuNode::Item(id)).await?;
    state
        .repos
        .menus
        .delete_item(id)
        .await
        .or_not_found(ErrorCode::MenuItemNotFound)?;
    Ok(ApiResponse::message("Menu item deleted"))
}

/// POST /menus/items/{id}/variants
pub async fn create_variant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<VariantCreate>,
) -> ServiceResult<impl IntoResponse> {
    authorize_node(&state, &user, MenuNode::Item(item_id)).await?;
    let variant: Variant = state
        .repos
        .menus
        .create_variant(item_id, req)
        .await
        .or_not_found(ErrorCode::MenuItemNotFound)?;
    Ok(created(variant, "Variant created"))
}

/// DELETE /menus/variants/{id}
pub async fn delete_variant(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    authorize_node(&state, &user, MenuNode::Variant(id)).await?;
    state
        .repos
        .menus
        .delete_variant(id)
        .await
        .or_not_found(ErrorCode::VariantNotFound)?;
    Ok(ApiResponse::message("Variant deleted"))
}
