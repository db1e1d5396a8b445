use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, DbErr, PaginatorTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One attendance entry per (session, student). The composite primary key is
/// the storage-level uniqueness constraint.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    pub status: AttendanceStatus,
    pub checked_in_at: DateTime<Utc>,
    pub client_timestamp: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub distance_m: Option<f64>,
    pub location_verified: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status_type")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "absent")]
    Absent,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_session::Entity",
        from = "Column::SessionId",
        to = "super::class_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_one(
        db: &DatabaseConnection,
        session_id: Uuid,
        user_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id((session_id, user_id)).one(db).await
    }

    /// Records of a session with their users, in check-in order.
    pub async fn list_for_session(
        db: &DatabaseConnection,
        session_id: Uuid,
    ) -> Result<Vec<(Self, Option<super::user::Model>)>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::CheckedInAt)
            .find_also_related(super::user::Entity)
            .all(db)
            .await
    }

    /// Everything a student has on file, newest first.
    pub async fn list_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CheckedInAt)
            .all(db)
            .await
    }

    /// Number of students who actually attended (`present` or `late`).
    pub async fn attended_count(db: &DatabaseConnection, session_id: Uuid) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.ne(AttendanceStatus::Absent))
            .count(db)
            .await
    }
}
