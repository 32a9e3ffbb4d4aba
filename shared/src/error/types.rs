//! Error types and the error envelope sent to clients

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every failure that reaches a client is expressed as an `AppError`:
/// - a stable [`ErrorCode`] (which also fixes the HTTP status)
/// - a human-readable message
/// - optional structured details (only exposed in development)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::AlreadyExists, msg)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    /// Error for a bare HTTP status that did not originate from a handler.
    ///
    /// An empty `message` falls back to the code's default message.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let code = ErrorCode::from_http_status(status);
        let message = message.into();
        if message.is_empty() {
            Self::new(code)
        } else {
            Self::with_message(code, message)
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        use validator::ValidationErrorsKind;

        let mut fields: Vec<String> = errors.errors().keys().map(|f| f.to_string()).collect();
        fields.sort();

        let mut err = Self::validation(format!("Validation failed: {}", fields.join(", ")));
        for (field, kind) in errors.errors() {
            let reasons: Vec<Value> = match kind {
                ValidationErrorsKind::Field(problems) => problems
                    .iter()
                    .map(|p| match &p.message {
                        Some(msg) => Value::String(msg.to_string()),
                        None => Value::String(p.code.to_string()),
                    })
                    .collect(),
                ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => {
                    vec![Value::String("invalid nested value".into())]
                }
            };
            err = err.with_detail(field.to_string(), Value::Array(reasons));
        }
        err
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Body of a failed response: `{"success": false, "error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub status_code: u16,
    pub code: ErrorCode,
    /// RFC 3339 time the error was produced
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ErrorEnvelope {
    /// Envelope without request context and without details.
    pub fn from_error(err: &AppError, status: StatusCode) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                message: err.message.clone(),
                status_code: status.as_u16(),
                code: err.code,
                timestamp: chrono::Utc::now().to_rfc3339(),
                path: None,
                method: None,
                details: None,
            },
        }
    }

    pub fn with_request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.error.method = Some(method.into());
        self.error.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Option<HashMap<String, Value>>) -> Self {
        self.error.details = details;
        self
    }
}

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();

        if matches!(self.code.category(), ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        let body = ErrorEnvelope::from_error(&self, status);
        let mut response = (status, Json(body)).into_response();
        // Kept so the envelope middleware can enrich the body with request context.
        response.extensions_mut().insert(self);
        response
    }
}
