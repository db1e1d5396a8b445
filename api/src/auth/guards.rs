use std::collections::HashMap;

use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::course_role::{self, Role};

use crate::auth::claims::AuthUser;
use crate::response::{ApiResponse, Empty};
use crate::state::AppState;

type GuardRejection = (StatusCode, Json<ApiResponse<Empty>>);

/// Verifies the bearer token and stores the caller in the request extensions.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), GuardRejection> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(req: Request<Body>, next: Next) -> Result<Response, GuardRejection> {
    let (req, _user) = extract_and_insert_authuser(req).await?;
    Ok(next.run(req).await)
}

/// Allows admins and the professors and assistants of `{course_id}`.
///
/// Database errors deny access.
pub async fn allow_course_staff(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    let course_id = params
        .get("course_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Missing or invalid course_id")),
        ))?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    match course_role::Model::has_any_role(app_state.db(), user.0.sub, course_id, Role::STAFF).await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Professor or assistant access required for this course",
            )),
        )),
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id = user.0.sub,
                course_id,
                "DB error while checking role; denying access"
            );
            Err((
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error(
                    "Professor or assistant access required for this course",
                )),
            ))
        }
    }
}
