use api::{auth::generate_jwt, state::AppState};
use chrono::{DateTime, Duration, Utc};
use db::models::{
    class_session,
    course::Model as CourseModel,
    course_role::{Model as CourseRoleModel, Role},
    user::Model as UserModel,
};

pub const CENTER: (f64, f64) = (36.6372, 127.4896);

/// A course with a professor, an assistant, two students and an outsider.
pub struct Fixture {
    pub course: CourseModel,
    pub professor: UserModel,
    pub assistant: UserModel,
    pub student: UserModel,
    pub student2: UserModel,
    pub outsider: UserModel,
}

impl Fixture {
    pub fn token(user: &UserModel) -> String {
        generate_jwt(user.id, user.admin).unwrap().0
    }

    /// Persistent session of `self.course`, 10 minutes long, 50 m radius.
    pub async fn session(
        &self,
        state: &AppState,
        starts_at: DateTime<Utc>,
        require_code: bool,
    ) -> class_session::Model {
        class_session::Model::create(
            state.db(),
            class_session::NewClassSession {
                course_id: self.course.id,
                created_by: self.professor.id,
                title: "Lecture".into(),
                starts_at,
                duration: Duration::minutes(10),
                latitude: CENTER.0,
                longitude: CENTER.1,
                radius_m: 50.0,
                active: true,
                require_code,
                rotation_seconds: 30,
                secret_hex: None,
            },
        )
        .await
        .unwrap()
    }
}

pub async fn fixture(state: &AppState) -> Fixture {
    let db = state.db();
    let course = CourseModel::create(db, "CS204", 2026, "Systems Programming")
        .await
        .unwrap();

    let mk = |name: &'static str| async move {
        UserModel::create(db, name, &format!("{name}@uni.test"), "password123", false)
            .await
            .unwrap()
    };
    let professor = mk("prof").await;
    let assistant = mk("ta").await;
    let student = mk("kim").await;
    let student2 = mk("lee").await;
    let outsider = mk("park").await;

    for (u, role) in [
        (&professor, Role::Professor),
        (&assistant, Role::Assistant),
        (&student, Role::Student),
        (&student2, Role::Student),
    ] {
        CourseRoleModel::assign(db, u.id, course.id, role).await.unwrap();
    }

    Fixture {
        course,
        professor,
        assistant,
        student,
        student2,
        outsider,
    }
}
