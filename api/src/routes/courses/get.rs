use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use db::models::course;
use serde::Serialize;

use super::CourseResponse;
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::internal_error;
use crate::state::AppState;

#[derive(Debug, Serialize, Default)]
pub struct CourseListResponse {
    pub courses: Vec<CourseResponse>,
}

/// GET /courses
///
/// Courses in which the caller holds any role.
pub async fn list_my_courses(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> impl IntoResponse {
    match course::Model::for_user(state.db(), claims.sub).await {
        Ok(courses) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                CourseListResponse {
                    courses: courses.into_iter().map(CourseResponse::from).collect(),
                },
                "Courses retrieved",
            )),
        ),
        Err(e) => internal_error(e, "Failed to list courses"),
    }
}
