use axum::http::StatusCode;

use crate::helpers::{make_test_app, send};

#[tokio::test]
async fn health_is_public() {
    let (app, _state) = make_test_app().await;
    let resp = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"], "OK");
}
