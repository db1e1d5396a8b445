use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use db::models::{attendance_record, class_session};
use serde::{Deserialize, Serialize};
use services::{SessionOrigin, code};
use uuid::Uuid;

use super::common::{
    AttendanceRecordResponse, SessionResponse, expire_stale, load_records, records_to_csv,
    resolve_in_course,
};
use crate::response::ApiResponse;
use crate::routes::common::internal_error;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Default)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
}

/// GET /courses/{course_id}/attendance/sessions?active=true
///
/// Persistent sessions of the course, newest first, each with the number of
/// students who attended. Sessions whose window has passed are marked
/// inactive on the way out.
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Query(q): Query<ListSessionsQuery>,
) -> impl IntoResponse {
    let db = state.db();
    let now = Utc::now();

    let models = match class_session::Model::list_for_course(db, course_id).await {
        Ok(v) => v,
        Err(e) => return internal_error(e, "Failed to list attendance sessions"),
    };

    let mut sessions = Vec::with_capacity(models.len());
    for m in models {
        let m = match expire_stale(&state, m, now).await {
            Ok(m) => m,
            Err(e) => return internal_error(e, "Failed to expire attendance session"),
        };
        if q.active.is_some_and(|want| want != m.active) {
            continue;
        }
        let attended = match attendance_record::Model::attended_count(db, m.id).await {
            Ok(n) => n,
            Err(e) => return internal_error(e, "Failed to count attendance"),
        };
        sessions.push(SessionResponse::from(m).with_attended(attended));
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            SessionListResponse { sessions },
            "Attendance sessions retrieved",
        )),
    )
}

/// GET /courses/{course_id}/attendance/sessions/{session_id}
///
/// Works for persistent and demo sessions.
pub async fn get_session(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, Uuid)>,
) -> impl IntoResponse {
    let db = state.db();
    let now = Utc::now();

    match class_session::Model::find_in_course(db, course_id, session_id).await {
        Ok(Some(m)) => {
            let m = match expire_stale(&state, m, now).await {
                Ok(m) => m,
                Err(e) => return internal_error(e, "Failed to expire attendance session"),
            };
            let attended = match attendance_record::Model::attended_count(db, m.id).await {
                Ok(n) => n,
                Err(e) => return internal_error(e, "Failed to count attendance"),
            };
            return (
                StatusCode::OK,
                Json(ApiResponse::success(
                    SessionResponse::from(m).with_attended(attended),
                    "Attendance session retrieved",
                )),
            );
        }
        Ok(None) => {}
        Err(e) => return internal_error(e, "Failed to load attendance session"),
    }

    let resolved = match resolve_in_course(&state, course_id, session_id, now).await {
        Ok(Some(r)) if r.origin == SessionOrigin::Demo => r,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Attendance session not found")),
            );
        }
        Err(e) => return internal_error(e, "Failed to resolve attendance session"),
    };

    let attended = state
        .registry()
        .demo()
        .records(session_id)
        .await
        .len() as u64;

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            SessionResponse::from_demo(resolved.snapshot).with_attended(attended),
            "Attendance session retrieved",
        )),
    )
}

#[derive(Debug, Serialize, Default)]
pub struct SessionCodeResponse {
    pub code: String,
    pub window: i64,
    pub rotation_seconds: i32,
    /// Seconds until the code changes.
    pub expires_in: i64,
    /// What the lecture-hall display encodes as a QR code.
    pub qr_payload: String,
}

/// GET /courses/{course_id}/attendance/sessions/{session_id}/code
///
/// The current rotating code for the QR display.
///
/// ### Responses
/// - `200 OK`
/// - `400 Bad Request` when the session is not running
/// - `404 Not Found`
pub async fn get_session_code(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, Uuid)>,
) -> impl IntoResponse {
    let now = Utc::now();

    let session = match resolve_in_course(&state, course_id, session_id, now).await {
        Ok(Some(r)) => r.snapshot,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<SessionCodeResponse>::error(
                    "Attendance session not found",
                )),
            );
        }
        Err(e) => return internal_error(e, "Failed to resolve attendance session"),
    };

    if !session.active || now < session.starts_at {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Session is not currently active")),
        );
    }

    let window = code::window(now, session.rotation_seconds);
    let current = code::code_for_window(&session.secret, window);

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            SessionCodeResponse {
                qr_payload: format!("{}:{}", session.id, current),
                code: current,
                window,
                rotation_seconds: session.rotation_seconds,
                expires_in: code::seconds_until_rotation(now, session.rotation_seconds),
            },
            "Current code",
        )),
    )
}

#[derive(Debug, Serialize, Default)]
pub struct RecordListResponse {
    pub records: Vec<AttendanceRecordResponse>,
}

/// GET /courses/{course_id}/attendance/sessions/{session_id}/records
///
/// Every record of the session in check-in order, including `absent` rows
/// written when the session was closed.
pub async fn list_session_records(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, Uuid)>,
) -> impl IntoResponse {
    match load_records(&state, course_id, session_id).await {
        Ok(Some(records)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                RecordListResponse { records },
                "Attendance records retrieved",
            )),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance session not found")),
        ),
        Err(e) => internal_error(e, "Failed to load attendance records"),
    }
}

/// GET /courses/{course_id}/attendance/sessions/{session_id}/records/export
///
/// Same rows as [`list_session_records`] as a CSV attachment.
pub async fn export_session_records_csv(
    State(state): State<AppState>,
    Path((course_id, session_id)): Path<(i64, Uuid)>,
) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    let records = match load_records(&state, course_id, session_id).await {
        Ok(Some(records)) => records,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                headers,
                "Attendance session not found".to_string(),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, %session_id, "Failed to export attendance records");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                "Internal server error".to_string(),
            );
        }
    };

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = format!("attachment; filename=\"attendance_{session_id}.csv\"");
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).unwrap_or(HeaderValue::from_static("attachment")),
    );

    (StatusCode::OK, headers, records_to_csv(&records))
}
