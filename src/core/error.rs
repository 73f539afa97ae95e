use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Target row is absent or belongs to someone else. The two cases are not
    /// distinguished in the response.
    #[error("Not found: {0}")]
    NotFound(String),

    /// One message per offending field.
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Object storage is not configured")]
    StorageUnavailable,

    #[error("Storage gateway error: {0}")]
    Gateway(String),

    /// Object deletion failed while its metadata row still exists.
    #[error("Cleanup error for '{key}': {reason}")]
    Cleanup { key: String, reason: String },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Cleanup { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Auth(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error occurred".to_string(), None)
            }
            AppError::NotFound(msg) => (msg, None),
            AppError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            AppError::BadRequest(msg) => (msg, None),
            AppError::StorageUnavailable => (
                "Object storage is not configured".to_string(),
                None,
            ),
            AppError::Gateway(msg) => {
                tracing::error!("Storage gateway error: {}", msg);
                (
                    "Storage backend is unavailable, try again later".to_string(),
                    None,
                )
            }
            AppError::Cleanup { ref key, ref reason } => {
                tracing::error!(
                    key = %key,
                    "Cleanup failed, object kept with its metadata row: {}",
                    reason
                );
                ("Failed to remove stored object".to_string(), None)
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
            AppError::Auth(msg) => (msg, None),
            AppError::Unauthorized(msg) => (msg, None),
            AppError::Conflict(msg) => (msg, None),
        };

        let body = Json(ApiResponse::<()>::error(message, errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
