use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, JoinType, QuerySelect, Set};
use serde::Serialize;

use super::course_role;

/// A taught course (e.g. "CS204" in 2026) that owns class sessions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub code: String,
    pub year: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course_role::Entity")]
    Roles,
    #[sea_orm(has_many = "super::class_session::Entity")]
    Sessions,
}

impl Related<super::course_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Roles.def()
    }
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        year: i32,
        title: &str,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            code: Set(code.trim().to_uppercase()),
            year: Set(year),
            title: Set(title.trim().to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// All courses in which `user_id` holds any role.
    pub async fn for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .join(JoinType::InnerJoin, Relation::Roles.def())
            .filter(course_role::Column::UserId.eq(user_id))
            .all(db)
            .await
    }
}
