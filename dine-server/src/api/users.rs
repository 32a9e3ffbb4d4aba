//! User management handlers

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{User, UserRole, UserUpdate};
use shared::request::Page;
use shared::response::{ApiResponse, Paginated};

use super::{ApiResult, ValidatedJson};
use crate::auth::CurrentUser;
use crate::db::UserChanges;
use crate::error::{DbResultExt, OptionExt};
use crate::state::AppState;
use crate::util::hash_password;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<UserRole>,
}

/// GET /users
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<UserQuery>,
) -> ApiResult<Paginated<User>> {
    user.require_admin()?;
    let page = Page::new(query.page, query.limit);
    let (items, total) = state.repos.users.list(query.role, page.into()).await?;
    Ok(ApiResponse::ok(Paginated::new(items, page.page, page.limit, total)))
}

/// GET /users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<User> {
    user.ensure_self_or_admin(id)?;
    let found = state
        .repos
        .users
        .find_by_id(id)
        .await?
        .or_missing(ErrorCode::UserNotFound)?;
    Ok(ApiResponse::ok(found))
}

/// PUT /users/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UserUpdate>,
) -> ApiResult<User> {
    user.ensure_self_or_admin(id)?;
    if req.touches_privileged_fields() {
        user.require_admin()?;
    }

    let password_hash = req
        .password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))?;
    let changes = UserChanges {
        name: req.name.map(|n| n.trim().to_string()),
        phone: req.phone,
        password_hash,
        role: req.role,
        restaurant_id: req.restaurant_id,
    };
    let updated = state
        .repos
        .users
        .update(id, changes)
        .await
        .or_not_found(ErrorCode::UserNotFound)?;
    tracing::info!(user_id = id, by = user.id, "User updated");
    Ok(ApiResponse::ok_with_message(updated, "User updated"))
}

/// DELETE /users/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require_admin()?;
    if id == user.id {
        return Err(AppError::new(ErrorCode::CannotDeleteSelf).into());
    }
    state
        .repos
        .users
        .delete(id)
        .await
        .or_not_found(ErrorCode::UserNotFound)?;
    tracing::info!(user_id = id, by = user.id, "User deleted");
    Ok(ApiResponse::message("User deleted"))
}
