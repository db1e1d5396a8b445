use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use common::format_validation_errors;
use db::models::course_role::{self, Role};
use serde::{Deserialize, Serialize};
use services::{CheckInContext, CheckInRequest, evaluate, geo::Coordinates};
use uuid::Uuid;
use validator::Validate;

use super::error::CheckInError;
use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckInBody {
    pub session_id: Uuid,

    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 0.0, message = "accuracy must not be negative"))]
    pub accuracy: f64,

    /// RFC 3339; any offset is accepted and normalized to UTC.
    pub client_timestamp: DateTime<Utc>,

    #[validate(length(max = 16, message = "code is too long"))]
    pub code: Option<String>,
}

impl From<CheckInBody> for CheckInRequest {
    fn from(b: CheckInBody) -> Self {
        Self {
            session_id: b.session_id,
            position: Coordinates::new(b.latitude, b.longitude),
            accuracy_m: b.accuracy,
            client_timestamp: b.client_timestamp,
            code: b.code.map(|c| c.trim().to_owned()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub status: String,
    pub location_verified: bool,
}

/// POST /attendance/check-in
///
/// ### Request Body
/// ```json
/// {
///   "sessionId": "4f0c7e3e-9a53-4c55-b1f4-5f0f5d0b2a11",
///   "latitude": 36.6372,
///   "longitude": 127.4896,
///   "accuracy": 12.5,
///   "clientTimestamp": "2026-09-14T09:02:11+09:00",
///   "code": "492817"
/// }
/// ```
/// `code` is only needed for sessions that require one.
///
/// ### Responses
/// - `200 OK`
/// ```json
/// { "success": true, "sessionId": "4f0c…", "status": "present", "locationVerified": true }
/// ```
/// - `400` / `401` / `403` / `404` / `409` / `500`
/// ```json
/// { "success": false, "code": "clock_skew", "message": "Device clock differs from server time by 120s" }
/// ```
pub async fn check_in(
    State(state): State<AppState>,
    auth: Result<AuthUser, (StatusCode, &'static str)>,
    payload: Result<Json<CheckInBody>, JsonRejection>,
) -> Result<Json<CheckInResponse>, CheckInError> {
    let AuthUser(claims) = auth.map_err(|_| CheckInError::Unauthenticated)?;

    let Json(body) = payload.map_err(|e| CheckInError::InvalidRequest(e.body_text()))?;
    body.validate()
        .map_err(|e| CheckInError::InvalidRequest(format_validation_errors(&e)))?;
    let request = CheckInRequest::from(body);

    let now = Utc::now();
    let registry = state.registry();
    let recorder = state.recorder();

    let resolved = match registry.lookup(request.session_id, now).await? {
        Some(r) => Some(registry.expire_if_past(r, now).await?),
        None => None,
    };

    let already_recorded = match &resolved {
        Some(r) => {
            let enrolled = course_role::Model::has_any_role(
                state.db(),
                claims.sub,
                r.snapshot.course_id,
                &[Role::Student],
            )
            .await?;
            if !enrolled {
                tracing::debug!(
                    user_id = claims.sub,
                    session_id = %request.session_id,
                    "Check-in by user not enrolled as student"
                );
                return Err(CheckInError::NotEnrolled);
            }
            recorder.exists(r.snapshot.id, claims.sub, r.origin).await?
        }
        None => false,
    };

    let ctx = CheckInContext {
        now,
        student_id: claims.sub,
        policy: state.policy(),
        already_recorded,
    };

    let draft = evaluate(resolved.as_ref().map(|r| &r.snapshot), &request, &ctx).map_err(
        |rejection| {
            tracing::debug!(
                user_id = claims.sub,
                session_id = %request.session_id,
                code = rejection.code(),
                reason = %rejection,
                "Check-in rejected"
            );
            CheckInError::from(rejection)
        },
    )?;

    // `evaluate` only succeeds for a resolved session.
    let Some(origin) = resolved.map(|r| r.origin) else {
        return Err(services::CheckInRejection::SessionNotFound.into());
    };

    if let Err(e) = recorder.record(&draft, origin).await {
        if matches!(e, services::RecordError::AlreadyPresent) {
            tracing::info!(
                user_id = claims.sub,
                session_id = %draft.session_id,
                "Concurrent duplicate check-in lost the insert race"
            );
        }
        return Err(e.into());
    }

    tracing::info!(
        user_id = claims.sub,
        session_id = %draft.session_id,
        status = %draft.status,
        distance_m = draft.distance_m,
        location_verified = draft.location_verified,
        "Check-in recorded"
    );

    Ok(Json(CheckInResponse {
        success: true,
        session_id: draft.session_id,
        status: draft.status.to_string(),
        location_verified: draft.location_verified,
    }))
}
