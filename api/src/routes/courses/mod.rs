//! `/courses` routes.
//!
//! - `POST /courses` → [`post::create_course`] (caller becomes professor)
//! - `GET /courses` → [`get::list_my_courses`]
//! - `POST /courses/{course_id}/enrollments` → [`post::enroll`]
//! - `/courses/{course_id}/attendance/...` → [`attendance`]
//!
//! Everything under `/courses/{course_id}` requires course staff.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::auth::guards::allow_course_staff;
use crate::state::AppState;

pub mod attendance;
pub mod get;
pub mod post;

pub fn courses_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(post::create_course).get(get::list_my_courses))
        .nest("/{course_id}", course_staff_routes(app_state))
}

fn course_staff_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/enrollments", post(post::enroll))
        .nest("/attendance", attendance::attendance_routes())
        .route_layer(from_fn_with_state(app_state, allow_course_staff))
}

#[derive(Debug, serde::Serialize, Default)]
pub struct CourseResponse {
    pub id: i64,
    pub code: String,
    pub year: i32,
    pub title: String,
    pub created_at: String,
}

impl From<db::models::course::Model> for CourseResponse {
    fn from(c: db::models::course::Model) -> Self {
        Self {
            id: c.id,
            code: c.code,
            year: c.year,
            title: c.title,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}
