//! Authenticated user extractors
//!
//! The token is read from the `Authorization: Bearer` header first, then
//! from the signed session cookie.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use http::request::Parts;
use shared::error::AppError;
use shared::models::UserRole;

use super::jwt::{Claims, JwtService};
use crate::crypto::{AUTH_COOKIE, find_cookie};
use crate::state::AppState;

/// Identity of the caller, taken from a valid access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    pub restaurant_id: Option<i64>,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse()
            .map_err(|_| AppError::invalid_token("Malformed token subject"))?;
        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
            restaurant_id: claims.restaurant_id,
        })
    }
}

/// Raw token from the request, `None` when no credentials were sent
fn find_token(parts: &Parts, state: &AppState) -> Result<Option<String>, AppError> {
    if let Some(header) = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        return JwtService::extract_from_header(header)
            .map(|t| Some(t.to_string()))
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"));
    }

    let Some(cookie) = parts
        .headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|h| find_cookie(h, AUTH_COOKIE))
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    state
        .cookies
        .verify(cookie)
        .map(|t| Some(t.to_string()))
        .ok_or_else(|| AppError::invalid_token("Invalid session cookie"))
}

fn authenticate(parts: &mut Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    if let Some(user) = parts.extensions.get::<CurrentUser>() {
        return Ok(Some(user.clone()));
    }
    let Some(token) = find_token(parts, state)? else {
        return Ok(None);
    };
    let claims = state.jwt.validate_token(&token).map_err(|e| {
        tracing::debug!(error = %e, uri = %parts.uri, "Token rejected");
        AppError::from(e)
    })?;
    let user = CurrentUser::try_from(claims)?;
    parts.extensions.insert(user.clone());
    Ok(Some(user))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or_else(AppError::not_authenticated)
    }
}

/// `Option<CurrentUser>`: anonymous callers pass, bad credentials still fail
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        authenticate(parts, state)
    }
}
