use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("File not found")]
    FileNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Share link has expired")]
    ShareLinkExpired,

    #[error("You have exceeded the maximum storage limit. Please contact the administrator at {0} to increase your storage quota")]
    QuotaExceeded(String),

    #[error("File too large")]
    FileTooLarge,

    #[error("Authentication required")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    PermissionDenied,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::FileNotFound => (StatusCode::NOT_FOUND, "File not found"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            AppError::ShareLinkExpired => (StatusCode::GONE, "Share link has expired"),
            AppError::QuotaExceeded(_) => (StatusCode::BAD_REQUEST, "Storage limit exceeded"),
            AppError::FileTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "File too large"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "Permission denied"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::DatabaseError(_) => {
                tracing::error!("Database error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::IoError(_) => {
                tracing::error!("IO error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error")
            }
            AppError::ServerError(_) => {
                tracing::error!("Server error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
