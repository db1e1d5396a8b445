use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use common::format_validation_errors;
use db::models::user;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::generate_jwt;
use crate::response::ApiResponse;
use crate::routes::common::{internal_error, is_unique_violation};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64, message = "Username must be between 3 and 64 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Default)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub token: String,
    pub expires_at: String,
}

impl UserResponse {
    fn issue(user: user::Model) -> Result<Self, jsonwebtoken::errors::Error> {
        let (token, expires_at) = generate_jwt(user.id, user.admin)?;
        Ok(Self {
            id: user.id,
            username: user.username,
            email: user.email,
            admin: user.admin,
            token,
            expires_at,
        })
    }
}

/// POST /auth/register
///
/// ### Request Body
/// ```json
/// { "username": "u20260001", "email": "u20260001@uni.ac.kr", "password": "strongpassword" }
/// ```
///
/// ### Responses
/// - `201 Created` with the user and a fresh token
/// - `400 Bad Request` on validation failure
/// - `409 Conflict` when the username or email is taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<UserResponse>::error(format_validation_errors(&e))),
        );
    }

    let db = state.db();

    match user::Model::find_by_username(db, &req.username).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::error("A user with this username already exists")),
            );
        }
        Ok(None) => {}
        Err(e) => return internal_error(e, "Failed to look up username"),
    }

    let user = match user::Model::create(db, &req.username, &req.email, &req.password, false).await
    {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::error("A user with this email already exists")),
            );
        }
        Err(e) => return internal_error(e, "Failed to create user"),
    };

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    match UserResponse::issue(user) {
        Ok(body) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(body, "User registered successfully")),
        ),
        Err(e) => internal_error(e, "Failed to issue token"),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login
///
/// ### Request Body
/// ```json
/// { "username": "u20260001", "password": "strongpassword" }
/// ```
///
/// ### Responses
/// - `200 OK` with the user and a fresh token
/// - `401 Unauthorized` for an unknown user or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match user::Model::verify_credentials(state.db(), &req.username, &req.password).await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(username = %req.username, "Rejected login");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<UserResponse>::error("Invalid username or password")),
            );
        }
        Err(e) => return internal_error(e, "Failed to verify credentials"),
    };

    match UserResponse::issue(user) {
        Ok(body) => (StatusCode::OK, Json(ApiResponse::success(body, "Login successful"))),
        Err(e) => internal_error(e, "Failed to issue token"),
    }
}
