use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use uuid::Uuid;

use super::session::SESSION_KEY_ADMIN_ID;
use crate::db::{Directory, DirectoryError};

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    SessionError,
    DirectoryError(DirectoryError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required. Please log in.",
            )
                .into_response(),
            AuthError::SessionError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error occurred.").into_response()
            }
            AuthError::DirectoryError(e) => {
                tracing::error!(error = %e, "Admin check failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred.").into_response()
            }
        }
    }
}

/// An admin whose status was confirmed against the directory on this request
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub admin_id: Uuid,
}

/// Resolves the signed-in admin.
///
/// The session only remembers who signed in; admin status is re-read from the
/// directory every time and a stale session is cleared.
pub async fn require_admin(
    session: &Session,
    directory: &Directory,
) -> Result<AuthenticatedAdmin, AuthError> {
    let admin_id: Uuid = session
        .get(SESSION_KEY_ADMIN_ID)
        .await
        .map_err(|_| AuthError::SessionError)?
        .ok_or(AuthError::Unauthorized)?;

    let is_admin = directory
        .is_admin(admin_id)
        .await
        .map_err(AuthError::DirectoryError)?;

    if !is_admin {
        tracing::warn!(admin_id = %admin_id, "Session refers to a user who is no longer an admin");
        session
            .remove::<Uuid>(SESSION_KEY_ADMIN_ID)
            .await
            .map_err(|_| AuthError::SessionError)?;
        return Err(AuthError::Unauthorized);
    }

    Ok(AuthenticatedAdmin { admin_id })
}
