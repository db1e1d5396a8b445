use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{make_test_app, send};

#[tokio::test]
async fn register_then_login() {
    let (app, _state) = make_test_app().await;

    let resp = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "u20260001", "email": "u20260001@uni.test", "password": "password123" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["data"]["username"], "u20260001");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));

    let resp = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "u20260001", "password": "password123" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["message"], "Login successful");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (app, _state) = make_test_app().await;
    send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "u20260002", "email": "u20260002@uni.test", "password": "password123" })),
    )
    .await;

    let resp = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "u20260002", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["success"], false);
}

#[tokio::test]
async fn register_rejects_duplicates_and_short_passwords() {
    let (app, _state) = make_test_app().await;
    let body = json!({ "username": "u20260003", "email": "u20260003@uni.test", "password": "password123" });

    assert_eq!(
        send(&app, "POST", "/api/auth/register", None, Some(body.clone())).await.status,
        StatusCode::CREATED
    );
    assert_eq!(
        send(&app, "POST", "/api/auth/register", None, Some(body)).await.status,
        StatusCode::CONFLICT
    );

    let resp = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "u20260004", "email": "u20260004@uni.test", "password": "short" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["message"], "Password must be at least 8 characters");
}
