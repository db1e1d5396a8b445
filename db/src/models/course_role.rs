use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Links a user to a course with a role.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "course_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i64,
    pub role: Role,
}

/// Role a user holds within a course.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "course_role_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "professor")]
    Professor,

    #[sea_orm(string_value = "assistant")]
    Assistant,

    #[sea_orm(string_value = "student")]
    Student,
}

impl Role {
    /// Roles allowed to create and manage sessions.
    pub const STAFF: &'static [Role] = &[Role::Professor, Role::Assistant];
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Assigns `role` to the user in the course, replacing any previous role.
    pub async fn assign(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        role: Role,
    ) -> Result<(), DbErr> {
        Entity::insert(ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            role: Set(role),
        })
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::CourseId])
                .update_column(Column::Role)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
        Ok(())
    }

    pub async fn role_of(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Role>, DbErr> {
        Ok(Entity::find_by_id((user_id, course_id))
            .one(db)
            .await?
            .map(|m| m.role))
    }

    pub async fn has_any_role(
        db: &DatabaseConnection,
        user_id: i64,
        course_id: i64,
        roles: &[Role],
    ) -> Result<bool, DbErr> {
        Ok(Self::role_of(db, user_id, course_id)
            .await?
            .is_some_and(|r| roles.contains(&r)))
    }

    /// IDs of every student enrolled in the course.
    pub async fn student_ids(db: &DatabaseConnection, course_id: i64) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::UserId)
            .filter(Column::CourseId.eq(course_id))
            .filter(Column::Role.eq(Role::Student))
            .into_tuple::<i64>()
            .all(db)
            .await
    }
}
