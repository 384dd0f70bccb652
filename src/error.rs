use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::repositories::RepositoryError;
use crate::services::{
    auth_service::AuthServiceError, booking_validator::BookingError,
    user_service::UserServiceError,
};

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures that escape a handler as a bare HTTP response. Expected
/// rejections (taken slots, bad input) are turned into flash messages
/// before they get here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not found")]
    NotFound,

    #[error("Invalid security token")]
    Csrf,

    #[error("Internal server error")]
    InternalError,

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => AppError::Database(e),
            RepositoryError::NotFound => AppError::NotFound,
            RepositoryError::AlreadyExists => AppError::Validation(err.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound => AppError::NotFound,
            BookingError::Storage(e) => AppError::Database(e),
            other => AppError::Validation(other.user_message()),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => AppError::NotFound,
            UserServiceError::RepositoryError(e) => e.into(),
            UserServiceError::HashingError(_) => AppError::InternalError,
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidCredentials => AppError::Unauthenticated,
            AuthServiceError::UserNotFound => AppError::NotFound,
            AuthServiceError::RepositoryError(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthenticated => return Redirect::to("/").into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Appointment not found".to_string()),
            AppError::Csrf => (
                StatusCode::FORBIDDEN,
                "Invalid security token. Please refresh the page and try again.".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(ref e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Session(ref e) => {
                error!("session error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Template(ref e) => {
                error!("template error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_rejection_is_bad_request() {
        let response = AppError::from(BookingError::SlotTaken).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_appointment_is_not_found() {
        let response = AppError::from(BookingError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");
    }

    #[test]
    fn test_storage_failure_hides_detail() {
        let response = AppError::from(BookingError::Storage(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
