use api::{routes::routes, state::AppState};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use db::test_utils::setup_test_db;
use serde_json::Value;
use services::CheckInPolicy;
use tower::ServiceExt;
use util::config::AppConfig;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Router over a fresh, migrated in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    make_test_app_with_policy(CheckInPolicy::default()).await
}

pub async fn make_test_app_with_policy(policy: CheckInPolicy) -> (Router, AppState) {
    AppConfig::set_jwt_secret(TEST_JWT_SECRET);

    let db = setup_test_db().await;
    let state = AppState::new(db, policy);
    let app = Router::new()
        .nest("/api", routes(state.clone()))
        .with_state(state.clone());
    (app, state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

/// Sends one request. `body` is sent as JSON when present.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(v) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        text: String::from_utf8_lossy(&bytes).into_owned(),
    }
}
