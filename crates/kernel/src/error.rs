//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure of a service operation.
///
/// Every variant except `Internal` is an expected outcome that the HTTP layer
/// turns into a re-rendered form, a redirect with a flash message, or a 404.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more submitted fields are missing or invalid.
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    /// The referenced id or slug does not exist (or is not visible).
    #[error("not found")]
    NotFound,

    /// The caller is authenticated but lacks the required capability.
    #[error("{0}")]
    Forbidden(String),

    /// The caller must log in first.
    #[error("authentication required")]
    Unauthorized,

    /// The operation was refused because other records still depend on the target.
    #[error("{0}")]
    Refused(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Build a validation error carrying a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    /// Build a forbidden error carrying a user-facing message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors for JSON endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let payload = serde_json::json!({ "success": false, "error": body });
        (status, axum::Json(payload)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => AppError::NotFound,
            ServiceError::Unauthorized => AppError::Unauthorized,
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::Internal(e) => AppError::Internal(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_joined_for_display() {
        let err = ServiceError::Validation(vec![
            "Title is required.".to_string(),
            "Body is required.".to_string(),
        ]);
        assert_eq!(err.to_string(), "Title is required. Body is required.");
    }

    #[test]
    fn service_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(ServiceError::NotFound),
            AppError::NotFound
        ));
        assert!(matches!(
            AppError::from(ServiceError::Unauthorized),
            AppError::Unauthorized
        ));
        assert!(matches!(
            AppError::from(ServiceError::forbidden("nope")),
            AppError::Forbidden(message) if message == "nope"
        ));
        assert!(matches!(
            AppError::from(ServiceError::Refused("in use".to_string())),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn forbidden_responds_with_403() {
        let response = AppError::from(ServiceError::forbidden("nope")).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AppError::BadRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
