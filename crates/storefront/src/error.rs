//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use seamline_core::EmailError;

use crate::db::DataStoreError;
use crate::services::{IdentityError, MailError, StorageError};

/// Request input that failed validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// A required field is missing or blank.
    #[error("{0} is required")]
    Required(&'static str),

    /// A field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A numeric parameter is below its minimum.
    #[error("{field} must be at least {min}")]
    TooSmall { field: &'static str, min: u32 },

    /// A numeric parameter is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Data store operation failed.
    #[error("Data store error: {0}")]
    DataStore(#[from] DataStoreError),

    /// Identity provider operation failed.
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    /// Sending email failed.
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Client input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body too large.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unsupported upload type.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A feature's backing service is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::DataStore(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Identity(_) | Self::Mail(_) | Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::DataStore(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Identity(_) | Self::Mail(_) | Self::Storage(_) => {
                "External service error".to_string()
            }
            Self::Validation(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg)
            | Self::PayloadTooLarge(msg)
            | Self::UnsupportedMediaType(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && !matches!(self, Self::ServiceUnavailable(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product".to_string());
        assert_eq!(err.to_string(), "Not found: product");

        let err = AppError::Validation(ValidationError::Required("name"));
        assert_eq!(err.to_string(), "Validation error: name is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::PayloadTooLarge("test".to_string())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::ServiceUnavailable("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::DataStore(DataStoreError::Unavailable(
                "down".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_masked() {
        let response = AppError::DataStore(DataStoreError::Api {
            status: 500,
            message: "relation \"orders\" does not exist".to_string(),
        })
        .into_response();
        assert_eq!(
            body_json(response).await,
            json!({"error": "Internal server error"})
        );

        let response = AppError::Validation(ValidationError::TooLong {
            field: "message",
            max: 5000,
        })
        .into_response();
        assert_eq!(
            body_json(response).await,
            json!({"error": "message must be at most 5000 characters"})
        );
    }
}
