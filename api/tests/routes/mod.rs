mod auth_test;
mod check_in_test;
mod health_test;
mod me_test;
mod sessions_test;
