use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::middleware::auth::AuthError;
use crate::db::DirectoryError;

/// Failures in page handlers.
///
/// Unexpected errors are logged server-side; the client only sees a generic message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0:?}")]
    Auth(AuthError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Auth(e) => return e.into_response(),
            AppError::Directory(ref e) => {
                tracing::error!(error = %e, "Directory request failed");
                "Database error occurred"
            }
            AppError::Session(ref e) => {
                tracing::error!(error = %e, "Session store failed");
                "Session error occurred"
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
