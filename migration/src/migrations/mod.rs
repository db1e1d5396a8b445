pub mod m202609010001_create_users;
pub mod m202609010002_create_courses;
pub mod m202609010003_create_course_roles;
pub mod m202609020001_create_class_sessions;
pub mod m202609020002_create_attendance_records;
