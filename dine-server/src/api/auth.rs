//! Registration, login and the session cookie

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Router, middleware};
use http::StatusCode;
use http::header::SET_COOKIE;
use shared::error::{AppError, ErrorCode};
use shared::models::{AuthResponse, LoginRequest, RegisterRequest, User, UserRole};
use shared::response::ApiResponse;

use super::{ApiResult, ValidatedJson};
use crate::auth::CurrentUser;
use crate::auth::rate_limit::login_rate_limit;
use crate::db::NewUser;
use crate::error::{DbResultExt, OptionExt, ServiceResult};
use crate::state::AppState;
use crate::util::{hash_password, verify_password};

pub fn router(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    Router::new()
        .merge(limited)
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Issue a token for `user` and the matching `Set-Cookie` value
fn issue_session(state: &AppState, user: &User) -> ServiceResult<(String, String)> {
    let token = state.jwt.generate_token(user).map_err(AppError::from)?;
    let cookie = state
        .cookies
        .session_cookie(&token, state.jwt.lifetime_secs())
        .map_err(|e| AppError::internal(format!("Failed to sign session cookie: {e}")))?;
    Ok((token, cookie))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ServiceResult<impl IntoResponse> {
    let role = req.role.unwrap_or(UserRole::Customer);
    if !role.is_self_assignable() {
        return Err(AppError::new(ErrorCode::RegistrationRoleNotAllowed)
            .with_detail("role", role.as_str())
            .into());
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))?;
    let user = state
        .repos
        .users
        .create(NewUser {
            email: req.email.trim().to_lowercase(),
            password_hash,
            name: req.name.trim().to_string(),
            phone: req.phone,
            role,
            restaurant_id: None,
        })
        .await
        .on_conflict(ErrorCode::EmailAlreadyRegistered)?;

    let (token, cookie) = issue_session(&state, &user)?;
    tracing::info!(user_id = user.id, role = %user.role, "User registered");
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        ApiResponse::ok_with_message(AuthResponse { user, token }, "Registration successful"),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ServiceResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let user = match state.repos.users.find_by_email(&email).await? {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            tracing::debug!(email = %email, "Login failed");
            return Err(AppError::invalid_credentials().into());
        }
    };

    let (token, cookie) = issue_session(&state, &user)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok((
        [(SET_COOKIE, cookie)],
        ApiResponse::ok_with_message(AuthResponse { user, token }, "Login successful"),
    ))
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, state.cookies.clear_cookie())],
        ApiResponse::message("Logged out"),
    )
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<User> {
    let user = state
        .repos
        .users
        .find_by_id(current.id)
        .await?
        .or_missing(ErrorCode::UserNotFound)?;
    Ok(ApiResponse::ok(user))
}
