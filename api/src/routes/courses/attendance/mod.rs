//! `/courses/{course_id}/attendance` routes, all behind `allow_course_staff`.
//!
//! - `POST /sessions` → [`create_session`]
//! - `GET /sessions` → [`list_sessions`]
//! - `GET /sessions/{session_id}` → [`get_session`]
//! - `POST /sessions/{session_id}/close` → [`close_session`]
//! - `GET /sessions/{session_id}/code` → [`get_session_code`]
//! - `GET /sessions/{session_id}/records` → [`list_session_records`]
//! - `GET /sessions/{session_id}/records/export` → [`export_session_records_csv`]
//! - `POST /demo-sessions` → [`create_demo_session`] (not mounted in production)

use axum::{
    Router,
    routing::{get, post},
};
use util::config;

use crate::state::AppState;

pub mod common;
pub mod get;
pub mod post;

pub use get::{
    export_session_records_csv, get_session, get_session_code, list_session_records,
    list_sessions,
};
pub use post::{close_session, create_demo_session, create_session};

pub fn attendance_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/close", post(close_session))
        .route("/sessions/{session_id}/code", get(get_session_code))
        .route("/sessions/{session_id}/records", get(list_session_records))
        .route(
            "/sessions/{session_id}/records/export",
            get(export_session_records_csv),
        );

    if config::env().eq_ignore_ascii_case("production") {
        router
    } else {
        router.route("/demo-sessions", post(create_demo_session))
    }
}
