//! Shared types for the ordering API
//!
//! Domain models, the error system, response envelopes and the real-time
//! wire protocol used by the server and its tests.

pub mod error;
pub mod models;
pub mod realtime;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use response::{ApiResponse, Paginated};
