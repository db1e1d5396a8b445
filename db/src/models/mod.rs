pub mod attendance_record;
pub mod class_session;
pub mod course;
pub mod course_role;
pub mod user;

pub use attendance_record::Entity as AttendanceRecord;
pub use class_session::Entity as ClassSession;
pub use course::Entity as Course;
pub use course_role::Entity as CourseRole;
pub use user::Entity as User;
