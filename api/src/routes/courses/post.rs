use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::format_validation_errors;
use db::models::{
    course,
    course_role::{self, Role},
    user,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::CourseResponse;
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{internal_error, is_unique_violation};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 20, message = "Course code must be between 1 and 20 characters"))]
    pub code: String,

    #[validate(range(min = 2000, max = 2100, message = "Year must be between 2000 and 2100"))]
    pub year: i32,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
}

/// POST /courses
///
/// Creates a course and makes the caller its professor.
///
/// ### Request Body
/// ```json
/// { "code": "CS204", "year": 2026, "title": "Systems Programming" }
/// ```
///
/// ### Responses
/// - `201 Created`
/// - `400 Bad Request` on validation failure
/// - `409 Conflict` when the code is already used for that year
pub async fn create_course(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<CreateCourseRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<CourseResponse>::error(format_validation_errors(&e))),
        );
    }

    let db = state.db();
    let created = match course::Model::create(db, &req.code, req.year, &req.title).await {
        Ok(c) => c,
        Err(e) if is_unique_violation(&e) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::error("A course with this code already exists for that year")),
            );
        }
        Err(e) => return internal_error(e, "Failed to create course"),
    };

    if let Err(e) = course_role::Model::assign(db, claims.sub, created.id, Role::Professor).await {
        return internal_error(e, "Failed to assign course creator");
    }

    tracing::info!(course_id = created.id, code = %created.code, user_id = claims.sub, "Course created");

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(CourseResponse::from(created), "Course created")),
    )
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Default)]
pub struct EnrollmentResponse {
    pub user_id: i64,
    pub course_id: i64,
    pub role: String,
}

/// POST /courses/{course_id}/enrollments
///
/// Gives a user a role in the course, replacing any role they held.
/// Only professors (and admins) may grant staff roles.
///
/// ### Request Body
/// ```json
/// { "username": "u20260001", "role": "student" }
/// ```
///
/// ### Responses
/// - `200 OK`
/// - `403 Forbidden` when an assistant tries to grant a staff role
/// - `404 Not Found` for an unknown username
pub async fn enroll(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<EnrollRequest>,
) -> impl IntoResponse {
    let db = state.db();

    if req.role != Role::Student && !claims.admin {
        match course_role::Model::role_of(db, claims.sub, course_id).await {
            Ok(Some(Role::Professor)) => {}
            Ok(_) => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(ApiResponse::<EnrollmentResponse>::error(
                        "Only professors can grant staff roles",
                    )),
                );
            }
            Err(e) => return internal_error(e, "Failed to check caller role"),
        }
    }

    let target = match user::Model::find_by_username(db, &req.username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("User not found")),
            );
        }
        Err(e) => return internal_error(e, "Failed to look up user"),
    };

    if let Err(e) = course_role::Model::assign(db, target.id, course_id, req.role).await {
        return internal_error(e, "Failed to assign course role");
    }

    tracing::info!(course_id, user_id = target.id, role = %req.role, "Course role assigned");

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            EnrollmentResponse {
                user_id: target.id,
                course_id,
                role: req.role.to_string(),
            },
            "Enrollment saved",
        )),
    )
}
