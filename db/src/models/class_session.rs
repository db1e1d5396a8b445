use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, QueryOrder, Set};
use serde::Serialize;

/// A scheduled class meeting during which students may check in.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "class_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: i64,
    pub created_by: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    /// End of the active window (`starts_at` + duration).
    pub ends_at: DateTime<Utc>,
    /// Geofence center.
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters.
    pub radius_m: f64,
    pub active: bool,
    /// When set, check-ins must carry the current rotating code.
    pub require_code: bool,
    pub rotation_seconds: i32,
    /// Hex HMAC key for rotating codes. Never serialized.
    #[serde(skip_serializing)]
    pub secret: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Parameters for [`Model::create`].
#[derive(Debug, Clone)]
pub struct NewClassSession {
    pub course_id: i64,
    pub created_by: i64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub duration: Duration,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub active: bool,
    pub require_code: bool,
    pub rotation_seconds: i32,
    /// Fixed secret, mostly for tests; a random one is generated when `None`.
    pub secret_hex: Option<String>,
}

/// 32 random bytes, hex encoded.
pub fn generate_secret() -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

impl Model {
    pub async fn create(db: &DatabaseConnection, new: NewClassSession) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(new.course_id),
            created_by: Set(new.created_by),
            title: Set(new.title),
            starts_at: Set(new.starts_at),
            ends_at: Set(new.starts_at + new.duration),
            latitude: Set(new.latitude),
            longitude: Set(new.longitude),
            radius_m: Set(new.radius_m),
            active: Set(new.active),
            require_code: Set(new.require_code),
            rotation_seconds: Set(new.rotation_seconds),
            secret: Set(new.secret_hex.unwrap_or_else(generate_secret)),
            closed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
    }

    /// Finds a session only if it belongs to `course_id`.
    pub async fn find_in_course(
        db: &DatabaseConnection,
        course_id: i64,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id)
            .filter(Column::CourseId.eq(course_id))
            .one(db)
            .await
    }

    /// Sessions of a course, newest start first.
    pub async fn list_for_course(
        db: &DatabaseConnection,
        course_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::CourseId.eq(course_id))
            .order_by_desc(Column::StartsAt)
            .all(db)
            .await
    }

    /// Marks the session inactive. `closed_at` is only set for manual closes.
    pub async fn deactivate(
        self,
        db: &DatabaseConnection,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, DbErr> {
        let mut active: ActiveModel = self.into();
        active.active = Set(false);
        if closed_at.is_some() {
            active.closed_at = Set(closed_at);
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.ends_at
    }
}
