//! Check-in verification.
//!
//! [`evaluate`] is a pure decision function: given the resolved session (if
//! any), the submitted request and the server-side context, it either produces
//! an [`AttendanceDraft`] ready to be persisted or a [`CheckInRejection`] with
//! a stable machine-readable code. It performs no I/O; the caller resolves the
//! session and the duplicate lookup beforehand and the recorder persists the
//! draft afterwards.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. existence
//! 2. activity window
//! 3. clock skew
//! 4. rotating code (only for sessions that require one)
//! 5. geofence and GPS accuracy
//! 6. duplicate
//! 7. present / late classification

use chrono::{DateTime, Duration, Utc};
use db::models::{attendance_record::AttendanceStatus, class_session};
use thiserror::Error;
use uuid::Uuid;

use crate::code;
use crate::geo::{Coordinates, haversine_m};
use crate::policy::{AccuracyPolicy, CheckInPolicy};

/// The parts of a session the validator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub course_id: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub center: Coordinates,
    pub radius_m: f64,
    pub active: bool,
    pub require_code: bool,
    pub rotation_seconds: i32,
    pub secret: String,
}

impl From<class_session::Model> for SessionSnapshot {
    fn from(m: class_session::Model) -> Self {
        Self {
            id: m.id,
            course_id: m.course_id,
            title: m.title,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            center: Coordinates::new(m.latitude, m.longitude),
            radius_m: m.radius_m,
            active: m.active,
            require_code: m.require_code,
            rotation_seconds: m.rotation_seconds,
            secret: m.secret,
        }
    }
}

/// A student's check-in attempt, already shape-validated.
#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub session_id: Uuid,
    pub position: Coordinates,
    pub accuracy_m: f64,
    pub client_timestamp: DateTime<Utc>,
    pub code: Option<String>,
}

/// Server-side inputs to [`evaluate`].
#[derive(Debug, Clone)]
pub struct CheckInContext<'a> {
    pub now: DateTime<Utc>,
    pub student_id: i64,
    pub policy: &'a CheckInPolicy,
    /// Whether a record already exists for (session, student). Advisory only;
    /// the recorder's insert is the authoritative duplicate check.
    pub already_recorded: bool,
}

/// An accepted check-in, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceDraft {
    pub session_id: Uuid,
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub location_verified: bool,
    pub distance_m: f64,
    pub position: Coordinates,
    pub accuracy_m: f64,
    pub checked_in_at: DateTime<Utc>,
    pub client_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckInRejection {
    #[error("Attendance session not found")]
    SessionNotFound,

    #[error("Attendance session is not active")]
    SessionInactive,

    #[error("Attendance session has ended")]
    SessionExpired,

    #[error("Device clock differs from server time by {skew_seconds}s")]
    ClockSkew { skew_seconds: i64 },

    #[error("Invalid or expired attendance code")]
    InvalidCode,

    #[error("Location is {distance_m:.0}m from the session (limit {radius_m:.0}m)")]
    OutOfRange { distance_m: f64, radius_m: f64 },

    #[error("Location accuracy of {accuracy_m:.0}m is too coarse (limit {threshold_m:.0}m)")]
    LowAccuracy { accuracy_m: f64, threshold_m: f64 },

    #[error("Attendance already recorded")]
    AlreadyPresent,
}

impl CheckInRejection {
    /// Stable wire code. Clients match on these strings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::SessionInactive => "session_inactive",
            Self::SessionExpired => "session_expired",
            Self::ClockSkew { .. } => "clock_skew",
            Self::InvalidCode => "invalid_code",
            Self::OutOfRange { .. } => "out_of_range",
            Self::LowAccuracy { .. } => "low_accuracy",
            Self::AlreadyPresent => "already_present",
        }
    }
}

/// `present` within the grace period after start (inclusive), `late` after.
pub fn classify(
    starts_at: DateTime<Utc>,
    checked_in_at: DateTime<Utc>,
    grace_period: Duration,
) -> AttendanceStatus {
    if checked_in_at - starts_at <= grace_period {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

pub fn evaluate(
    session: Option<&SessionSnapshot>,
    request: &CheckInRequest,
    ctx: &CheckInContext<'_>,
) -> Result<AttendanceDraft, CheckInRejection> {
    let policy = ctx.policy;

    let session = session.ok_or(CheckInRejection::SessionNotFound)?;

    if ctx.now > session.ends_at {
        return Err(CheckInRejection::SessionExpired);
    }
    if !session.active || ctx.now < session.starts_at {
        return Err(CheckInRejection::SessionInactive);
    }

    let skew_ms = (ctx.now - request.client_timestamp).num_milliseconds().abs();
    if skew_ms > policy.clock_skew_tolerance.num_milliseconds() {
        return Err(CheckInRejection::ClockSkew {
            skew_seconds: skew_ms / 1000,
        });
    }

    if session.require_code {
        let submitted = request.code.as_deref().unwrap_or_default();
        code::verify_code(
            &session.secret,
            session.rotation_seconds,
            submitted,
            ctx.now,
            policy.code_window_tolerance,
        )
        .ok_or(CheckInRejection::InvalidCode)?;
    }

    let radius_m = policy.effective_radius(session.radius_m);
    let distance_m = haversine_m(request.position, session.center);
    if distance_m > radius_m {
        return Err(CheckInRejection::OutOfRange {
            distance_m,
            radius_m,
        });
    }

    let precise = request.accuracy_m <= policy.accuracy_threshold_m;
    if !precise && policy.accuracy_policy == AccuracyPolicy::Reject {
        return Err(CheckInRejection::LowAccuracy {
            accuracy_m: request.accuracy_m,
            threshold_m: policy.accuracy_threshold_m,
        });
    }

    if ctx.already_recorded {
        return Err(CheckInRejection::AlreadyPresent);
    }

    Ok(AttendanceDraft {
        session_id: session.id,
        student_id: ctx.student_id,
        status: classify(session.starts_at, ctx.now, policy.grace_period),
        location_verified: precise,
        distance_m,
        position: request.position,
        accuracy_m: request.accuracy_m,
        checked_in_at: ctx.now,
        client_timestamp: request.client_timestamp,
    })
}
