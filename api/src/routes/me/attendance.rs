use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use db::models::attendance_record;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::internal_error;
use crate::state::AppState;

#[derive(Debug, Serialize, Default)]
pub struct MyAttendanceEntry {
    pub session_id: Uuid,
    pub status: String,
    pub checked_in_at: String,
    pub location_verified: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct MyAttendanceResponse {
    pub records: Vec<MyAttendanceEntry>,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
}

/// GET /me/attendance
///
/// The caller's persisted attendance records, newest first, with totals per
/// status.
pub async fn get_my_attendance(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> impl IntoResponse {
    let rows = match attendance_record::Model::list_for_user(state.db(), claims.sub).await {
        Ok(rows) => rows,
        Err(e) => return internal_error(e, "Failed to load own attendance"),
    };

    let count = |s: attendance_record::AttendanceStatus| rows.iter().filter(|r| r.status == s).count();
    let mut body = MyAttendanceResponse {
        present: count(attendance_record::AttendanceStatus::Present),
        late: count(attendance_record::AttendanceStatus::Late),
        absent: count(attendance_record::AttendanceStatus::Absent),
        records: Vec::with_capacity(rows.len()),
    };

    body.records.extend(rows.into_iter().map(|r| MyAttendanceEntry {
        session_id: r.session_id,
        status: r.status.to_string(),
        checked_in_at: r.checked_in_at.to_rfc3339(),
        location_verified: r.location_verified,
    }));

    (
        StatusCode::OK,
        Json(ApiResponse::success(body, "Attendance retrieved")),
    )
}
