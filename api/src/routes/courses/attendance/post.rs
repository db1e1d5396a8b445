use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use common::format_validation_errors;
use db::models::class_session;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::common::{CreateSessionRequest, SessionResponse};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::internal_error;
use crate::state::AppState;

/// POST /courses/{course_id}/attendance/sessions
///
/// ### Request Body
/// ```json
/// {
///   "title": "Lecture 3",
///   "starts_at": "2026-09-14T09:00:00Z",
///   "duration_minutes": 75,
///   "latitude": 36.6372,
///   "longitude": 127.4896,
///   "radius_m": 50,
///   "require_code": true,
///   "rotation_seconds": 30
/// }
/// ```
/// Only `title`, `latitude` and `longitude` are required. `starts_at`
/// defaults to now, the duration to 60 minutes and the radius to 50 m.
///
/// ### Responses
/// - `201 Created` with the session
/// - `400 Bad Request` on validation failure
pub async fn create_session(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<SessionResponse>::error(format_validation_errors(&e))),
        );
    }

    let new = req.into_new_session(course_id, claims.sub, Utc::now());
    match class_session::Model::create(state.db(), new).await {
        Ok(session) => {
            tracing::info!(
                session_id = %session.id,
                course_id,
                created_by = claims.sub,
                "Attendance session created"
            );
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(
                    SessionResponse::from(session).with_attended(0),
                    "Attendance session created",
                )),
            )
        }
        Err(e) => internal_error(e, "Failed to create attendance session"),
    }
}

/// POST /courses/{course_id}/attendance/demo-sessions
///
/// Same body as [`create_session`]. The session lives in memory only, is
/// never written to the database, and is dropped some time after it ends.
pub async fn create_demo_session(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<SessionResponse>::error(format_validation_errors(&e))),
        );
    }

    let now = Utc::now();
    let snapshot = req.into_demo_snapshot(course_id, now);
    state.registry().demo().insert(snapshot.clone(), now).await;

    tracing::info!(session_id = %snapshot.id, course_id, "Demo session created");

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(
            SessionResponse::from_demo(snapshot).with_attended(0),
            "Demo session created",
        )),
    )
}

#[derive(Debug, Serialize, Default)]
pub struct CloseSessionResponse {
    pub session: SessionResponse,
    pub absentees_marked: u64,
}

/// POST /courses/{course_id}/attendance/sessions/{session_id}/close
///
/// Deactivates the session and records every enrolled student without a
/// check-in as `absent`. Closing twice is harmless.
///
/// ### Responses
/// - `200 OK`
/// - `404 Not Found`
pub async fn close_session(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, Uuid)>,
) -> impl IntoResponse {
    let now = Utc::now();
    let registry = state.registry();

    let closed = match registry.close(course_id, session_id, now).await {
        Ok(Some(model)) => model,
        Ok(None) => {
            let in_course = registry
                .demo()
                .get(session_id, now)
                .await
                .is_some_and(|s| s.course_id == course_id);
            let demo = if in_course {
                registry.demo().deactivate(session_id, now).await
            } else {
                None
            };
            if let Some(demo) = demo {
                return (
                    StatusCode::OK,
                    Json(ApiResponse::success(
                        CloseSessionResponse {
                            session: SessionResponse::from_demo(demo),
                            absentees_marked: 0,
                        },
                        "Attendance session closed",
                    )),
                );
            }
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Attendance session not found")),
            );
        }
        Err(e) => return internal_error(e, "Failed to close attendance session"),
    };

    let absentees_marked = match state.recorder().mark_absentees(&closed, now).await {
        Ok(n) => n,
        Err(e) => return internal_error(e, "Failed to mark absentees"),
    };

    tracing::info!(session_id = %session_id, course_id, absentees_marked, "Attendance session closed");

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            CloseSessionResponse {
                session: SessionResponse::from(closed),
                absentees_marked,
            },
            "Attendance session closed",
        )),
    )
}
