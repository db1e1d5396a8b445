use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use crate::helpers::fixtures::CENTER;
use crate::helpers::{Fixture, fixture, make_test_app, send};

#[tokio::test]
async fn my_attendance_lists_own_records_with_totals() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let token = Fixture::token(&f.student);

    let attended = f.session(&state, Utc::now() - Duration::minutes(1), false).await;
    let missed = f.session(&state, Utc::now() - Duration::minutes(2), false).await;

    let resp = send(
        &app,
        "POST",
        "/api/attendance/check-in",
        Some(&token),
        Some(json!({
            "sessionId": attended.id,
            "latitude": CENTER.0,
            "longitude": CENTER.1,
            "accuracy": 5.0,
            "clientTimestamp": Utc::now().to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);

    let resp = send(
        &app,
        "POST",
        &format!(
            "/api/courses/{}/attendance/sessions/{}/close",
            f.course.id, missed.id
        ),
        Some(&Fixture::token(&f.professor)),
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);

    let resp = send(&app, "GET", "/api/me/attendance", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let data = &resp.json()["data"];
    assert_eq!(data["records"].as_array().unwrap().len(), 2);
    assert_eq!(data["present"], 1);
    assert_eq!(data["absent"], 1);
    assert_eq!(data["late"], 0);
}

#[tokio::test]
async fn my_attendance_requires_authentication() {
    let (app, _state) = make_test_app().await;
    let resp = send(&app, "GET", "/api/me/attendance", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}
