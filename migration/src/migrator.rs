use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202609010001_create_users::Migration),
            Box::new(migrations::m202609010002_create_courses::Migration),
            Box::new(migrations::m202609010003_create_course_roles::Migration),
            Box::new(migrations::m202609020001_create_class_sessions::Migration),
            Box::new(migrations::m202609020002_create_attendance_records::Migration),
        ]
    }
}
