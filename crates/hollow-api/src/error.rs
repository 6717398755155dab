//! API error taxonomy. Every error renders as `{"error": "<message>"}`.

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use hollow_types::api::ErrorResponse;

use crate::middleware::AuthError;
use crate::password::HashingError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input or identifier.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credential, or wrong password.
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    NotFound(String),

    /// Store unreachable or write failure. The message is client-safe; the
    /// underlying cause is logged where the error is built.
    #[error("{0}")]
    Persistence(String),

    #[error("Failed to hash password")]
    Hashing(#[from] HashingError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Log a store failure and turn it into a client-safe persistence error.
    pub fn store(context: &str, err: anyhow::Error) -> Self {
        error!("{}: {:#}", context, err);
        AppError::Persistence(context.to_string())
    }

    pub fn invalid_credentials() -> Self {
        AppError::Authentication("Invalid credentials".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Hashing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Hashing(ref e) = self {
            error!("Password hashing failed: {}", e);
        }

        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(err.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Authentication(err.to_string())
    }
}

/// Run blocking store or hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AppError::Internal("Internal server error".to_string())
    })?
}
