//! HTTP routes mounted under `/api`.
//!
//! - `/health` → liveness probe (public)
//! - `/auth` → register and login (public)
//! - `/courses` → courses, enrollments and attendance sessions (authenticated,
//!   course staff below `/courses/{course_id}`)
//! - `/attendance` → the student check-in endpoint (authenticated)
//! - `/me` → the caller's own attendance (authenticated)

use axum::{Router, middleware::from_fn};

use crate::auth::guards::allow_authenticated;
use crate::routes::{
    attendance::attendance_routes, auth::auth_routes, courses::courses_routes,
    health::health_routes, me::me_routes,
};
use crate::state::AppState;

pub mod attendance;
pub mod auth;
pub mod common;
pub mod courses;
pub mod health;
pub mod me;

/// Builds the `/api` router. The caller supplies the state with
/// `Router::with_state`.
///
/// `/attendance` is not wrapped in `allow_authenticated`: the check-in
/// handler authenticates through the `AuthUser` extractor itself so that a
/// missing token gets the check-in error body.
pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/health", health_routes())
        .nest("/auth", auth_routes())
        .nest(
            "/courses",
            courses_routes(app_state).route_layer(from_fn(allow_authenticated)),
        )
        .nest("/attendance", attendance_routes())
        .nest("/me", me_routes().route_layer(from_fn(allow_authenticated)))
}
