//! Restaurant handlers

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Router;
use axum::routing::get;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{DiningTable, Menu, Restaurant, RestaurantCreate, RestaurantUpdate, UserRole};
use shared::request::Page;
use shared::response::{ApiResponse, Paginated};
use shared::util::slugify;

use super::{ApiResult, ValidatedJson, created};
use crate::auth::CurrentUser;
use crate::db::{NewRestaurant, RestaurantFilter};
use crate::error::{DbResultExt, OptionExt, ServiceResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/tables", get(list_tables))
        .route("/{id}/menus", get(list_menus))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

async fn load(state: &AppState, id: i64) -> ServiceResult<Restaurant> {
    state
        .repos
        .restaurants
        .find_by_id(id)
        .await?
        .or_missing(ErrorCode::RestaurantNotFound)
}

/// GET /restaurants
pub async fn list(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<RestaurantQuery>,
) -> ApiResult<Paginated<Restaurant>> {
    let page = Page::new(query.page, query.limit);
    let filter = RestaurantFilter {
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        owner_id: None,
        include_inactive: query.include_inactive && user.is_some_and(|u| u.is_admin()),
    };
    let (items, total) = state.repos.restaurants.list(filter, page.into()).await?;
    Ok(ApiResponse::ok(Paginated::new(items, page.page, page.limit, total)))
}

/// GET /restaurants/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Restaurant> {
    Ok(ApiResponse::ok(load(&state, id).await?))
}

/// POST /restaurants
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<RestaurantCreate>,
) -> ServiceResult<impl IntoResponse> {
    user.require_role(&[UserRole::Owner, UserRole::Admin])?;

    let owner_id = match req.owner_id {
        Some(owner_id) if user.is_admin() => owner_id,
        _ => user.id,
    };
    let slug = match req.slug {
        Some(slug) => slug,
        None => slugify(&req.name),
    };
    if slug.is_empty() {
        return Err(AppError::validation("Cannot derive a slug from the name, provide one")
            .with_detail("field", "slug")
            .into());
    }

    let restaurant = state
        .repos
        .restaurants
        .create(NewRestaurant {
            owner_id,
            name: req.name.trim().to_string(),
            slug,
            description: req.description,
            address: req.address,
            phone: req.phone,
            email: req.email,
        })
        .await
        .on_conflict(ErrorCode::RestaurantSlugExists)?;

    tracing::info!(restaurant_id = restaurant.id, owner_id, slug = %restaurant.slug, "Restaurant created");
    Ok(created(restaurant, "Restaurant created"))
}

/// PUT /restaurants/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RestaurantUpdate>,
) -> ApiResult<Restaurant> {
    let restaurant = load(&state, id).await?;
    user.ensure_owner(&restaurant)?;

    let updated = state
        .repos
        .restaurants
        .update(id, req)
        .await
        .or_not_found(ErrorCode::RestaurantNotFound)
        .on_conflict(ErrorCode::RestaurantSlugExists)?;
    Ok(ApiResponse::ok_with_message(updated, "Restaurant updated"))
}

/// DELETE /restaurants/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let restaurant = load(&state, id).await?;
    user.ensure_owner(&restaurant)?;

    state
        .repos
        .restaurants
        .delete(id)
        .await
        .or_not_found(ErrorCode::RestaurantNotFound)?;
    tracing::info!(restaurant_id = id, user_id = user.id, "Restaurant deleted");
    Ok(ApiResponse::message("Restaurant deleted"))
}

/// GET /restaurants/{id}/tables
pub async fn list_tables(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<DiningTable>> {
    let restaurant = load(&state, id).await?;
    let tables = state.repos.tables.list_by_restaurant(restaurant.id).await?;
    Ok(ApiResponse::ok(tables))
}

/// GET /restaurants/{id}/menus
pub async fn list_menus(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Menu>> {
    let restaurant = load(&state, id).await?;
    let menus = state.repos.menus.list_menus(restaurant.id).await?;
    Ok(ApiResponse::ok(menus))
}
