//! Unified service-layer error type
//!
//! `ServiceError` bridges repository errors ([`DbError`]) and the API-layer
//! error ([`AppError`]) so handlers can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::DbError;

/// Service-layer error
///
/// - `Db`: repository error, translated by constraint kind
/// - `App`: business-rule error, passed through to the client
#[derive(Debug)]
pub enum ServiceError {
    Db(DbError),
    App(AppError),
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServiceError::App(e.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => db_err.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Give repository errors a resource-specific meaning
pub trait DbResultExt<T> {
    /// Map `NotFound` to a 404 naming the resource
    fn or_not_found(self, code: ErrorCode) -> ServiceResult<T>;
    /// Map a unique violation to a specific conflict code
    fn on_conflict(self, code: ErrorCode) -> ServiceResult<T>;
}

impl<T> DbResultExt<T> for Result<T, DbError> {
    fn or_not_found(self, code: ErrorCode) -> ServiceResult<T> {
        self.map_err(|e| match e {
            DbError::NotFound => ServiceError::App(AppError::new(code)),
            other => ServiceError::Db(other),
        })
    }

    fn on_conflict(self, code: ErrorCode) -> ServiceResult<T> {
        self.map_err(|e| match e {
            DbError::UniqueViolation(constraint) => {
                ServiceError::App(AppError::new(code).with_detail("constraint", constraint))
            }
            other => ServiceError::Db(other),
        })
    }
}

impl<T> DbResultExt<T> for ServiceResult<T> {
    fn or_not_found(self, code: ErrorCode) -> ServiceResult<T> {
        self.map_err(|e| match e {
            ServiceError::Db(DbError::NotFound) => ServiceError::App(AppError::new(code)),
            other => other,
        })
    }

    fn on_conflict(self, code: ErrorCode) -> ServiceResult<T> {
        self.map_err(|e| match e {
            ServiceError::Db(DbError::UniqueViolation(constraint)) => {
                ServiceError::App(AppError::new(code).with_detail("constraint", constraint))
            }
            other => other,
        })
    }
}

/// Unwrap a lookup or fail with a not-found error code
pub trait OptionExt<T> {
    fn or_missing(self, code: ErrorCode) -> ServiceResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_missing(self, code: ErrorCode) -> ServiceResult<T> {
        self.ok_or_else(|| ServiceError::App(AppError::new(code)))
    }
}
