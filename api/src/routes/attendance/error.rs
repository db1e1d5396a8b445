use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use services::{CheckInRejection, RecordError};
use thiserror::Error;

/// Every way a check-in can fail, each with a stable wire code.
#[derive(Debug, Error)]
pub enum CheckInError {
    #[error(transparent)]
    Rejected(#[from] CheckInRejection),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Only students enrolled in this course can check in")]
    NotEnrolled,

    #[error("Internal server error")]
    Internal(#[from] DbErr),
}

impl From<RecordError> for CheckInError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::AlreadyPresent => Self::Rejected(CheckInRejection::AlreadyPresent),
            RecordError::SessionMissing => Self::Rejected(CheckInRejection::SessionNotFound),
            RecordError::Db(e) => Self::Internal(e),
        }
    }
}

impl CheckInError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(r) => r.code(),
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unauthenticated => "unauthenticated",
            Self::NotEnrolled => "not_enrolled",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rejected(CheckInRejection::SessionNotFound) => StatusCode::NOT_FOUND,
            Self::Rejected(CheckInRejection::AlreadyPresent) => StatusCode::CONFLICT,
            Self::Rejected(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotEnrolled => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckInErrorBody {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for CheckInError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            tracing::error!(error = %e, "Check-in failed");
        }

        let body = CheckInErrorBody {
            success: false,
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
