//! Helpers shared by route handlers.

use axum::{Json, http::StatusCode};
use serde::Serialize;

use crate::response::ApiResponse;

/// Logs `err` and returns a 500 that does not leak its details.
pub fn internal_error<T>(err: impl std::fmt::Display, context: &str) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    tracing::error!(error = %err, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error("Internal server error")),
    )
}

pub use services::is_unique_violation;
