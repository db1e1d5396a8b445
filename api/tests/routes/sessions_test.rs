use axum::http::StatusCode;
use chrono::{Duration, Utc};
use db::models::attendance_record::{self, AttendanceStatus};
use serde_json::json;
use serial_test::serial;
use services::code;
use util::config::AppConfig;
use uuid::Uuid;

use crate::helpers::fixtures::CENTER;
use crate::helpers::{Fixture, fixture, make_test_app, send};

fn sessions_uri(course_id: i64) -> String {
    format!("/api/courses/{course_id}/attendance/sessions")
}

#[tokio::test]
async fn professor_creates_session_with_defaults() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;

    let resp = send(
        &app,
        "POST",
        &sessions_uri(f.course.id),
        Some(&Fixture::token(&f.professor)),
        Some(json!({ "title": "Lecture 1", "latitude": CENTER.0, "longitude": CENTER.1 })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);

    let data = &resp.json()["data"];
    assert_eq!(data["title"], "Lecture 1");
    assert_eq!(data["radius_m"], 50.0);
    assert_eq!(data["active"], true);
    assert_eq!(data["demo"], false);
    assert_eq!(data["attended_count"], 0);
    assert!(data.get("secret").is_none());
}

#[tokio::test]
async fn session_creation_validates_body() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;

    let resp = send(
        &app,
        "POST",
        &sessions_uri(f.course.id),
        Some(&Fixture::token(&f.assistant)),
        Some(json!({ "title": "", "latitude": 95.0, "longitude": CENTER.1 })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.json()["message"],
        "Latitude must be between -90 and 90; Title must be between 1 and 200 characters"
    );
}

#[tokio::test]
async fn students_and_outsiders_cannot_manage_sessions() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;

    for user in [&f.student, &f.outsider] {
        let resp = send(&app, "GET", &sessions_uri(f.course.id), Some(&Fixture::token(user)), None).await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
    }

    let resp = send(&app, "GET", &sessions_uri(f.course.id), None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_marks_finished_sessions_inactive() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let running = f.session(&state, Utc::now() - Duration::minutes(1), false).await;
    let finished = f.session(&state, Utc::now() - Duration::hours(2), false).await;
    let token = Fixture::token(&f.professor);

    let resp = send(&app, "GET", &sessions_uri(f.course.id), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let sessions = resp.json()["data"]["sessions"].as_array().unwrap().clone();
    assert_eq!(sessions.len(), 2);
    let by_id = |id: Uuid| {
        sessions
            .iter()
            .find(|s| s["id"] == id.to_string())
            .unwrap()
            .clone()
    };
    assert_eq!(by_id(running.id)["active"], true);
    assert_eq!(by_id(finished.id)["active"], false);

    let uri = format!("{}?active=true", sessions_uri(f.course.id));
    let resp = send(&app, "GET", &uri, Some(&token), None).await;
    let sessions = resp.json()["data"]["sessions"].as_array().unwrap().clone();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], running.id.to_string());
}

#[tokio::test]
async fn session_detail_is_scoped_to_course() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now(), false).await;
    let token = Fixture::token(&f.professor);

    let uri = format!("{}/{}", sessions_uri(f.course.id), s.id);
    let resp = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"]["id"], s.id.to_string());

    let uri = format!("{}/{}", sessions_uri(f.course.id), Uuid::new_v4());
    let resp = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn code_endpoint_returns_current_code() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), true).await;

    let uri = format!("{}/{}/code", sessions_uri(f.course.id), s.id);
    let resp = send(&app, "GET", &uri, Some(&Fixture::token(&f.assistant)), None).await;
    assert_eq!(resp.status, StatusCode::OK);

    let data = &resp.json()["data"];
    let returned = data["code"].as_str().unwrap();
    assert_eq!(returned.len(), 6);
    let window = data["window"].as_i64().unwrap();
    assert_eq!(returned, code::code_for_window(&s.secret, window));
    assert_eq!(data["qr_payload"], format!("{}:{}", s.id, returned));
    assert!((1..=30).contains(&data["expires_in"].as_i64().unwrap()));
}

#[tokio::test]
async fn code_endpoint_refuses_finished_sessions() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::hours(1), true).await;

    let uri = format!("{}/{}/code", sessions_uri(f.course.id), s.id);
    let resp = send(&app, "GET", &uri, Some(&Fixture::token(&f.professor)), None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn close_marks_absentees_and_blocks_check_ins() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    let resp = send(
        &app,
        "POST",
        "/api/attendance/check-in",
        Some(&Fixture::token(&f.student)),
        Some(json!({
            "sessionId": s.id,
            "latitude": CENTER.0,
            "longitude": CENTER.1,
            "accuracy": 5.0,
            "clientTimestamp": Utc::now().to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);

    let uri = format!("{}/{}/close", sessions_uri(f.course.id), s.id);
    let resp = send(&app, "POST", &uri, Some(&Fixture::token(&f.professor)), None).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    let data = &resp.json()["data"];
    assert_eq!(data["absentees_marked"], 1);
    assert_eq!(data["session"]["active"], false);
    assert!(data["session"]["closed_at"].is_string());

    let absent = attendance_record::Model::find_one(state.db(), s.id, f.student2.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(absent.status, AttendanceStatus::Absent);

    // Closing again adds nothing.
    let resp = send(&app, "POST", &uri, Some(&Fixture::token(&f.professor)), None).await;
    assert_eq!(resp.json()["data"]["absentees_marked"], 0);

    let resp = send(
        &app,
        "POST",
        "/api/attendance/check-in",
        Some(&Fixture::token(&f.student2)),
        Some(json!({
            "sessionId": s.id,
            "latitude": CENTER.0,
            "longitude": CENTER.1,
            "accuracy": 5.0,
            "clientTimestamp": Utc::now().to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(resp.json()["code"], "session_inactive");
}

#[tokio::test]
async fn records_list_and_csv_export() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    send(
        &app,
        "POST",
        "/api/attendance/check-in",
        Some(&Fixture::token(&f.student)),
        Some(json!({
            "sessionId": s.id,
            "latitude": CENTER.0,
            "longitude": CENTER.1,
            "accuracy": 5.0,
            "clientTimestamp": Utc::now().to_rfc3339(),
        })),
    )
    .await;

    let token = Fixture::token(&f.professor);
    let uri = format!("{}/{}/records", sessions_uri(f.course.id), s.id);
    let resp = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let records = resp.json()["data"]["records"].as_array().unwrap().clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["username"], "kim");
    assert_eq!(records[0]["status"], "present");

    let resp = send(&app, "GET", &format!("{uri}/export"), Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.headers.get("content-type").unwrap(),
        "text/csv; charset=utf-8"
    );
    let lines: Vec<&str> = resp.text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(&format!("{},kim,kim@uni.test,present,", f.student.id)));
}

#[tokio::test]
#[serial]
async fn demo_route_is_hidden_in_production() {
    AppConfig::set_env("production");
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;

    let resp = send(
        &app,
        "POST",
        &format!("/api/courses/{}/attendance/demo-sessions", f.course.id),
        Some(&Fixture::token(&f.professor)),
        Some(json!({ "title": "Demo", "latitude": CENTER.0, "longitude": CENTER.1 })),
    )
    .await;
    AppConfig::set_env("development");

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
