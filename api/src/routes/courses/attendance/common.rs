use chrono::{DateTime, Duration, Utc};
use db::models::{attendance_record, class_session, user};
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use services::{AttendanceDraft, ResolvedSession, SessionOrigin, SessionSnapshot, geo::Coordinates};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::state::AppState;

pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const DEFAULT_RADIUS_M: f64 = 50.0;
pub const DEFAULT_ROTATION_SECONDS: i32 = 30;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    /// Defaults to now.
    pub starts_at: Option<DateTime<Utc>>,

    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes"))]
    pub duration_minutes: Option<i64>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 1.0, max = 5000.0, message = "Radius must be between 1 and 5000 meters"))]
    pub radius_m: Option<f64>,

    pub active: Option<bool>,
    pub require_code: Option<bool>,

    #[validate(range(min = 5, max = 300, message = "Rotation must be between 5 and 300 seconds"))]
    pub rotation_seconds: Option<i32>,
}

impl CreateSessionRequest {
    fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES))
    }

    pub fn into_new_session(
        self,
        course_id: i64,
        created_by: i64,
        now: DateTime<Utc>,
    ) -> class_session::NewClassSession {
        class_session::NewClassSession {
            course_id,
            created_by,
            duration: self.duration(),
            starts_at: self.starts_at.unwrap_or(now),
            latitude: self.latitude,
            longitude: self.longitude,
            radius_m: self.radius_m.unwrap_or(DEFAULT_RADIUS_M),
            active: self.active.unwrap_or(true),
            require_code: self.require_code.unwrap_or(false),
            rotation_seconds: self.rotation_seconds.unwrap_or(DEFAULT_ROTATION_SECONDS),
            secret_hex: None,
            title: self.title,
        }
    }

    /// Builds an in-memory session with a fresh id and secret.
    pub fn into_demo_snapshot(self, course_id: i64, now: DateTime<Utc>) -> SessionSnapshot {
        let starts_at = self.starts_at.unwrap_or(now);
        SessionSnapshot {
            id: Uuid::new_v4(),
            course_id,
            ends_at: starts_at + self.duration(),
            starts_at,
            center: Coordinates::new(self.latitude, self.longitude),
            radius_m: self.radius_m.unwrap_or(DEFAULT_RADIUS_M),
            active: self.active.unwrap_or(true),
            require_code: self.require_code.unwrap_or(false),
            rotation_seconds: self.rotation_seconds.unwrap_or(DEFAULT_ROTATION_SECONDS),
            secret: class_session::generate_secret(),
            title: self.title,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct SessionResponse {
    pub id: Uuid,
    pub course_id: i64,
    pub title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub active: bool,
    pub require_code: bool,
    pub rotation_seconds: i32,
    pub closed_at: Option<String>,
    pub demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_count: Option<u64>,
}

impl From<class_session::Model> for SessionResponse {
    fn from(m: class_session::Model) -> Self {
        Self {
            id: m.id,
            course_id: m.course_id,
            title: m.title,
            starts_at: m.starts_at.to_rfc3339(),
            ends_at: m.ends_at.to_rfc3339(),
            latitude: m.latitude,
            longitude: m.longitude,
            radius_m: m.radius_m,
            active: m.active,
            require_code: m.require_code,
            rotation_seconds: m.rotation_seconds,
            closed_at: m.closed_at.map(|t| t.to_rfc3339()),
            demo: false,
            attended_count: None,
        }
    }
}

impl SessionResponse {
    pub fn from_demo(s: SessionSnapshot) -> Self {
        Self {
            id: s.id,
            course_id: s.course_id,
            title: s.title,
            starts_at: s.starts_at.to_rfc3339(),
            ends_at: s.ends_at.to_rfc3339(),
            latitude: s.center.latitude,
            longitude: s.center.longitude,
            radius_m: s.radius_m,
            active: s.active,
            require_code: s.require_code,
            rotation_seconds: s.rotation_seconds,
            closed_at: None,
            demo: true,
            attended_count: None,
        }
    }

    pub fn with_attended(mut self, count: u64) -> Self {
        self.attended_count = Some(count);
        self
    }
}

/// Flips `active` off for a persistent session whose window has passed.
pub async fn expire_stale(
    state: &AppState,
    model: class_session::Model,
    now: DateTime<Utc>,
) -> Result<class_session::Model, DbErr> {
    if !model.active || !model.has_ended(now) {
        return Ok(model);
    }
    let resolved = ResolvedSession {
        snapshot: model.clone().into(),
        origin: SessionOrigin::Persistent,
    };
    let resolved = state.registry().expire_if_past(resolved, now).await?;
    Ok(class_session::Model {
        active: resolved.snapshot.active,
        ..model
    })
}

/// Resolves a session (persistent or demo) that belongs to `course_id`.
pub async fn resolve_in_course(
    state: &AppState,
    course_id: i64,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<ResolvedSession>, DbErr> {
    let Some(resolved) = state.registry().lookup(session_id, now).await? else {
        return Ok(None);
    };
    if resolved.snapshot.course_id != course_id {
        return Ok(None);
    }
    state.registry().expire_if_past(resolved, now).await.map(Some)
}

#[derive(Debug, Serialize, Default, Clone)]
pub struct AttendanceRecordResponse {
    pub user_id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub checked_in_at: String,
    pub client_timestamp: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub distance_m: Option<f64>,
    pub location_verified: bool,
}

impl AttendanceRecordResponse {
    fn from_persisted(r: attendance_record::Model, u: Option<user::Model>) -> Self {
        Self {
            user_id: r.user_id,
            username: u.as_ref().map(|u| u.username.clone()),
            email: u.map(|u| u.email),
            status: r.status.to_string(),
            checked_in_at: r.checked_in_at.to_rfc3339(),
            client_timestamp: r.client_timestamp.map(|t| t.to_rfc3339()),
            latitude: r.latitude,
            longitude: r.longitude,
            accuracy_m: r.accuracy_m,
            distance_m: r.distance_m,
            location_verified: r.location_verified,
        }
    }

    fn from_demo(d: AttendanceDraft, u: Option<&user::Model>) -> Self {
        Self {
            user_id: d.student_id,
            username: u.map(|u| u.username.clone()),
            email: u.map(|u| u.email.clone()),
            status: d.status.to_string(),
            checked_in_at: d.checked_in_at.to_rfc3339(),
            client_timestamp: Some(d.client_timestamp.to_rfc3339()),
            latitude: Some(d.position.latitude),
            longitude: Some(d.position.longitude),
            accuracy_m: Some(d.accuracy_m),
            distance_m: Some(d.distance_m),
            location_verified: d.location_verified,
        }
    }
}

/// Records of a session in check-in order, or `None` if the session is not
/// part of the course.
pub async fn load_records(
    state: &AppState,
    course_id: i64,
    session_id: Uuid,
) -> Result<Option<Vec<AttendanceRecordResponse>>, DbErr> {
    let db = state.db();
    let Some(resolved) = resolve_in_course(state, course_id, session_id, Utc::now()).await? else {
        return Ok(None);
    };

    let records = match resolved.origin {
        SessionOrigin::Persistent => attendance_record::Model::list_for_session(db, session_id)
            .await?
            .into_iter()
            .map(|(r, u)| AttendanceRecordResponse::from_persisted(r, u))
            .collect(),
        SessionOrigin::Demo => {
            let drafts = state.registry().demo().records(session_id).await;
            let ids: Vec<i64> = drafts.iter().map(|d| d.student_id).collect();
            let users: HashMap<i64, user::Model> = user::Entity::find()
                .filter(user::Column::Id.is_in(ids))
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();
            drafts
                .into_iter()
                .map(|d| {
                    let u = users.get(&d.student_id);
                    AttendanceRecordResponse::from_demo(d, u)
                })
                .collect()
        }
    };

    Ok(Some(records))
}

/// Quotes a CSV field when it contains a separator, quote or newline.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn records_to_csv(records: &[AttendanceRecordResponse]) -> String {
    let mut csv = String::from(
        "user_id,username,email,status,checked_in_at,location_verified,distance_m,accuracy_m\n",
    );
    for r in records {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            r.user_id,
            csv_escape(r.username.as_deref().unwrap_or("")),
            csv_escape(r.email.as_deref().unwrap_or("")),
            r.status,
            r.checked_in_at,
            r.location_verified,
            r.distance_m.map(|d| format!("{d:.1}")).unwrap_or_default(),
            r.accuracy_m.map(|a| format!("{a:.1}")).unwrap_or_default(),
        ));
    }
    csv
}
