// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::notify::MailError;
use crate::validation::ValidationError;

/// HTTP-facing errors with stable error codes
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing or malformed Authorization header")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Auth service failure: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) | AppError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "AUTH_001",
            AppError::Forbidden(_) => "AUTH_002",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Auth(AuthError::Store(_)) => "STORE_001",
            AppError::Auth(AuthError::Password(_)) => "AUTH_003",
            AppError::Auth(AuthError::Token(_)) => "AUTH_004",
            AppError::Auth(AuthError::Notification(_)) | AppError::Mail(_) => "MAIL_001",
        }
    }

    /// Message safe to hand to a client. Infrastructure details never leave the server.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "Authentication required".to_string(),
            AppError::Forbidden(reason) => reason.clone(),
            AppError::InvalidInput(reason) => reason.clone(),
            AppError::Auth(AuthError::Notification(_)) | AppError::Mail(_) => {
                "Failed to send email, please try again later".to_string()
            },
            AppError::Auth(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        } else {
            tracing::debug!(code = error_code, error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": self.sanitized_message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordError;
    use crate::storage::StoreError;
    use axum::body::to_bytes;
    use std::io::{Error as IoError, ErrorKind};

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InvalidInput("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let store = AuthError::Store(StoreError::Unavailable("down".into()));
        assert_eq!(
            AppError::Auth(store).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(AppError::Unauthenticated.error_code(), "AUTH_001");
        assert_eq!(AppError::Forbidden("x".into()).error_code(), "AUTH_002");
        assert_eq!(
            AppError::Auth(AuthError::Password(PasswordError::CorruptCredential)).error_code(),
            "AUTH_003"
        );
        assert_eq!(
            AppError::Mail(MailError::Transport("refused".into())).error_code(),
            "MAIL_001"
        );
    }

    #[tokio::test]
    async fn test_infrastructure_details_are_sanitized() {
        let io = IoError::new(ErrorKind::PermissionDenied, "/var/lib/smartfarm/accounts.json");
        let err = AppError::Auth(AuthError::Store(StoreError::Io(io)));

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "STORE_001");
        let message = body["error"]["message"].as_str().unwrap();
        assert_eq!(message, "An internal server error occurred");
        assert!(!message.contains("accounts.json"));
    }

    #[tokio::test]
    async fn test_validation_message_reaches_client() {
        let err: AppError = ValidationError::InvalidEmail("Email format is invalid".into()).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VAL_001");
        assert_eq!(body["error"]["message"], "Invalid email: Email format is invalid");
    }

    #[tokio::test]
    async fn test_error_response_is_json() {
        let response = AppError::Unauthenticated.into_response();
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
    }
}
