//! Custom error types for the API service

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::lifecycle::LifecycleError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The caller does not own the resource
    #[error("Access denied")]
    Forbidden,

    /// Missing resource
    #[error("Launch page not found")]
    NotFound,

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// JSON body extractor whose rejections use the error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(message) | LifecycleError::Conflict(message) => {
                ApiError::BadRequest(message)
            }
            LifecycleError::NotFound => ApiError::NotFound,
            LifecycleError::Forbidden(denied) => {
                warn!("{}", denied);
                ApiError::Forbidden
            }
            LifecycleError::Storage(e) => {
                error!("Database error: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Launch page not found".to_string()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use auth::AccessDenied;
    use uuid::Uuid;

    #[test]
    fn lifecycle_errors_map_to_status_codes() {
        let cases = [
            (
                LifecycleError::Validation("Project name is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LifecycleError::Conflict("taken".into()),
                StatusCode::BAD_REQUEST,
            ),
            (LifecycleError::NotFound, StatusCode::NOT_FOUND),
            (
                LifecycleError::Forbidden(AccessDenied {
                    actor: Uuid::new_v4(),
                    owner: Uuid::new_v4(),
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                LifecycleError::Storage(common::error::DatabaseError::Decode("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
