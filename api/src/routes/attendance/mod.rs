//! `/attendance` routes.
//!
//! - `POST /attendance/check-in` → [`check_in::check_in`]

use axum::{Router, routing::post};

use crate::state::AppState;

pub mod check_in;
pub mod error;

pub fn attendance_routes() -> Router<AppState> {
    Router::new().route("/check-in", post(check_in::check_in))
}
