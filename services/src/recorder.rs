//! Persists accepted check-ins exactly once per (session, student).
//!
//! Uniqueness is enforced by the store itself: the composite primary key on
//! `attendance_records` for persistent sessions and a check-and-insert under
//! the demo store's write lock for demo sessions. A lost race surfaces as
//! [`RecordError::AlreadyPresent`], the same outcome the validator reports for
//! a known duplicate.

use chrono::{DateTime, Utc};
use db::models::{
    attendance_record::{self, AttendanceStatus},
    class_session, course_role,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::checkin::AttendanceDraft;
use crate::demo_store::DemoSessionStore;
use crate::registry::SessionOrigin;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Attendance already recorded")]
    AlreadyPresent,

    #[error("Attendance session no longer exists")]
    SessionMissing,

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// True for unique-constraint failures, whichever way the driver reports them.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("UNIQUE constraint failed")
}

fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
        || err.to_string().contains("FOREIGN KEY constraint failed")
}

#[derive(Clone, Debug)]
pub struct AttendanceRecorder {
    db: DatabaseConnection,
    demo: DemoSessionStore,
}

impl AttendanceRecorder {
    pub fn new(db: DatabaseConnection, demo: DemoSessionStore) -> Self {
        Self { db, demo }
    }

    /// Advisory duplicate lookup that feeds the validator.
    pub async fn exists(
        &self,
        session_id: Uuid,
        student_id: i64,
        origin: SessionOrigin,
    ) -> Result<bool, DbErr> {
        match origin {
            SessionOrigin::Persistent => {
                Ok(attendance_record::Model::find_one(&self.db, session_id, student_id)
                    .await?
                    .is_some())
            }
            SessionOrigin::Demo => Ok(self.demo.has_record(session_id, student_id).await),
        }
    }

    /// Persists `draft`. Exactly one of several concurrent calls for the same
    /// pair succeeds; the others get [`RecordError::AlreadyPresent`].
    pub async fn record(
        &self,
        draft: &AttendanceDraft,
        origin: SessionOrigin,
    ) -> Result<(), RecordError> {
        if origin == SessionOrigin::Demo {
            return self.demo.insert_record(draft).await;
        }

        let active = attendance_record::ActiveModel {
            session_id: Set(draft.session_id),
            user_id: Set(draft.student_id),
            status: Set(draft.status),
            checked_in_at: Set(draft.checked_in_at),
            client_timestamp: Set(Some(draft.client_timestamp)),
            latitude: Set(Some(draft.position.latitude)),
            longitude: Set(Some(draft.position.longitude)),
            accuracy_m: Set(Some(draft.accuracy_m)),
            distance_m: Set(Some(draft.distance_m)),
            location_verified: Set(draft.location_verified),
        };

        match attendance_record::Entity::insert(active)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(RecordError::AlreadyPresent),
            Err(e) if is_foreign_key_violation(&e) => Err(RecordError::SessionMissing),
            Err(e) => Err(RecordError::Db(e)),
        }
    }

    /// Inserts an `absent` record for every enrolled student of the session's
    /// course who has none. Existing records are left untouched.
    pub async fn mark_absentees(
        &self,
        session: &class_session::Model,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let students = course_role::Model::student_ids(&self.db, session.course_id).await?;
        if students.is_empty() {
            return Ok(0);
        }

        let rows = students.into_iter().map(|user_id| attendance_record::ActiveModel {
            session_id: Set(session.id),
            user_id: Set(user_id),
            status: Set(AttendanceStatus::Absent),
            checked_in_at: Set(now),
            client_timestamp: Set(None),
            latitude: Set(None),
            longitude: Set(None),
            accuracy_m: Set(None),
            distance_m: Set(None),
            location_verified: Set(false),
        });

        attendance_record::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    attendance_record::Column::SessionId,
                    attendance_record::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
    }
}
