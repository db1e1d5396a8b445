//! `/me` routes: data about the authenticated caller.
//!
//! - `GET /me/attendance` → [`attendance::get_my_attendance`]

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod attendance;

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/attendance", get(attendance::get_my_attendance))
}
