use axum::http::StatusCode;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use db::models::attendance_record;
use serde_json::{Value, json};
use serial_test::serial;
use services::{AccuracyPolicy, CheckInPolicy, SessionSnapshot, code, geo::Coordinates};
use util::config::AppConfig;
use uuid::Uuid;

use crate::helpers::fixtures::CENTER;
use crate::helpers::{Fixture, fixture, make_test_app, make_test_app_with_policy, send};

const CHECK_IN: &str = "/api/attendance/check-in";

fn body(session_id: Uuid, lat: f64, lon: f64, client_ts: DateTime<Utc>) -> Value {
    json!({
        "sessionId": session_id,
        "latitude": lat,
        "longitude": lon,
        "accuracy": 8.0,
        "clientTimestamp": client_ts.to_rfc3339(),
    })
}

fn at_center(session_id: Uuid) -> Value {
    body(session_id, CENTER.0, CENTER.1, Utc::now())
}

#[tokio::test]
async fn on_time_check_in_scenario() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;
    let token = Fixture::token(&f.student);

    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(s.id))).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    let json = resp.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "present");
    assert_eq!(json["locationVerified"], true);
    assert_eq!(json["sessionId"], s.id.to_string());

    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(s.id))).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.json()["code"], "already_present");

    let ahead = body(s.id, CENTER.0, CENTER.1, Utc::now() + Duration::minutes(2));
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(ahead)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["code"], "clock_skew");

    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(Uuid::new_v4()))).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json()["code"], "session_not_found");
    assert_eq!(resp.json()["success"], false);

    let rows = attendance_record::Model::list_for_session(state.db(), s.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn check_in_after_grace_period_is_late() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(7), false).await;

    let resp = send(
        &app,
        "POST",
        CHECK_IN,
        Some(&Fixture::token(&f.student)),
        Some(at_center(s.id)),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "late");
}

#[tokio::test]
async fn outside_geofence_is_out_of_range() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    // ~111 m north of the center.
    let far = body(s.id, CENTER.0 + 0.001, CENTER.1, Utc::now());
    let resp = send(&app, "POST", CHECK_IN, Some(&Fixture::token(&f.student)), Some(far)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["code"], "out_of_range");
}

#[tokio::test]
async fn clock_skew_is_reported_before_geofence() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    let far_and_skewed = body(s.id, CENTER.0 + 0.01, CENTER.1, Utc::now() - Duration::minutes(5));
    let resp = send(
        &app,
        "POST",
        CHECK_IN,
        Some(&Fixture::token(&f.student)),
        Some(far_and_skewed),
    )
    .await;
    assert_eq!(resp.json()["code"], "clock_skew");
}

#[tokio::test]
async fn timestamps_with_offsets_are_normalized() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    let kst = FixedOffset::east_opt(9 * 3600).unwrap();
    let local = Utc::now().with_timezone(&kst).to_rfc3339();
    let payload = json!({
        "sessionId": s.id,
        "latitude": CENTER.0,
        "longitude": CENTER.1,
        "accuracy": 5.0,
        "clientTimestamp": local,
    });
    let resp = send(&app, "POST", CHECK_IN, Some(&Fixture::token(&f.student)), Some(payload)).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
}

#[tokio::test]
async fn expired_session_is_rejected_and_deactivated() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(20), false).await;

    let resp = send(
        &app,
        "POST",
        CHECK_IN,
        Some(&Fixture::token(&f.student)),
        Some(at_center(s.id)),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["code"], "session_expired");

    let reloaded = db::models::class_session::Model::find_in_course(state.db(), f.course.id, s.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!reloaded.active);
}

#[tokio::test]
async fn inactive_and_future_sessions_are_inactive() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let token = Fixture::token(&f.student);

    let closed = f.session(&state, Utc::now() - Duration::minutes(1), false).await;
    let closed = closed.deactivate(state.db(), Some(Utc::now())).await.unwrap();
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(closed.id))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["code"], "session_inactive");

    let future = f.session(&state, Utc::now() + Duration::minutes(30), false).await;
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(future.id))).await;
    assert_eq!(resp.json()["code"], "session_inactive");
}

#[tokio::test]
async fn malformed_requests_are_invalid_request() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;
    let token = Fixture::token(&f.student);

    let cases = vec![
        body(s.id, 91.0, CENTER.1, Utc::now()),
        body(s.id, CENTER.0, -181.0, Utc::now()),
        json!({
            "sessionId": s.id,
            "latitude": CENTER.0,
            "longitude": CENTER.1,
            "accuracy": -1.0,
            "clientTimestamp": Utc::now().to_rfc3339(),
        }),
        json!({
            "sessionId": s.id,
            "latitude": CENTER.0,
            "longitude": CENTER.1,
            "accuracy": 5.0,
            "clientTimestamp": "yesterday",
        }),
        json!({ "sessionId": "not-a-uuid", "latitude": 0, "longitude": 0, "accuracy": 1, "clientTimestamp": Utc::now().to_rfc3339() }),
        json!({ "latitude": CENTER.0 }),
    ];

    for case in cases {
        let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(case.clone())).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{case}");
        assert_eq!(resp.json()["code"], "invalid_request", "{case}");
    }
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthenticated() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    let resp = send(&app, "POST", CHECK_IN, None, Some(at_center(s.id))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["code"], "unauthenticated");

    let resp = send(&app, "POST", CHECK_IN, Some("garbage"), Some(at_center(s.id))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_students_are_not_enrolled() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    for user in [&f.outsider, &f.professor] {
        let resp = send(
            &app,
            "POST",
            CHECK_IN,
            Some(&Fixture::token(user)),
            Some(at_center(s.id)),
        )
        .await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
        assert_eq!(resp.json()["code"], "not_enrolled");
    }
}

#[tokio::test]
async fn code_sessions_require_the_current_code() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), true).await;
    let token = Fixture::token(&f.student);

    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(s.id))).await;
    assert_eq!(resp.json()["code"], "invalid_code");

    let mut with_code = at_center(s.id);
    with_code["code"] = json!("000000x");
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(with_code)).await;
    assert_eq!(resp.json()["code"], "invalid_code");

    let mut with_code = at_center(s.id);
    with_code["code"] = json!(code::current_code(&s.secret, s.rotation_seconds, Utc::now()));
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(with_code)).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
}

#[tokio::test]
async fn coarse_fix_is_annotated_by_default() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    let mut coarse = at_center(s.id);
    coarse["accuracy"] = json!(250.0);
    let resp = send(&app, "POST", CHECK_IN, Some(&Fixture::token(&f.student)), Some(coarse)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["locationVerified"], false);

    let row = attendance_record::Model::find_one(state.db(), s.id, f.student.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!row.location_verified);
}

#[tokio::test]
async fn coarse_fix_is_rejected_under_reject_policy() {
    let policy = CheckInPolicy {
        accuracy_policy: AccuracyPolicy::Reject,
        ..CheckInPolicy::default()
    };
    let (app, state) = make_test_app_with_policy(policy).await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;

    let mut coarse = at_center(s.id);
    coarse["accuracy"] = json!(250.0);
    let resp = send(&app, "POST", CHECK_IN, Some(&Fixture::token(&f.student)), Some(coarse)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["code"], "low_accuracy");
}

#[tokio::test]
async fn concurrent_duplicates_record_once() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let s = f.session(&state, Utc::now() - Duration::minutes(1), false).await;
    let token = Fixture::token(&f.student);

    let (a, b) = tokio::join!(
        send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(s.id))),
        send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(s.id)))
    );

    let mut statuses = [a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let rows = attendance_record::Model::list_for_session(state.db(), s.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
#[serial]
async fn demo_sessions_accept_check_ins_without_touching_the_database() {
    AppConfig::set_env("development");
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
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let demo_id: Uuid = resp.json()["data"]["id"].as_str().unwrap().parse().unwrap();

    let token = Fixture::token(&f.student);
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(demo_id))).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(demo_id))).await;
    assert_eq!(resp.json()["code"], "already_present");

    assert_eq!(state.registry().demo().records(demo_id).await.len(), 1);
    assert!(
        attendance_record::Model::list_for_session(state.db(), demo_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn finished_demo_session_is_expired_before_any_sweep() {
    let (app, state) = make_test_app().await;
    let f = fixture(&state).await;
    let started = Utc::now() - Duration::minutes(30);
    let demo = SessionSnapshot {
        id: Uuid::new_v4(),
        course_id: f.course.id,
        title: "Demo".into(),
        starts_at: started,
        ends_at: started + Duration::minutes(10),
        center: Coordinates::new(CENTER.0, CENTER.1),
        radius_m: 50.0,
        active: true,
        require_code: false,
        rotation_seconds: 30,
        secret: "ef".repeat(32),
    };
    let demo_id = demo.id;
    state.registry().demo().insert(demo, started).await;

    let token = Fixture::token(&f.student);
    let resp = send(&app, "POST", CHECK_IN, Some(&token), Some(at_center(demo_id))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["code"], "session_expired");

    let stored = state.registry().demo().get(demo_id, Utc::now()).await.unwrap();
    assert!(!stored.active);
    assert!(state.registry().demo().records(demo_id).await.is_empty());
}
