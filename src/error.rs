//! Error types for the data room store.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message shown to the user when the persistent storage is full.
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "Storage quota exceeded. Please delete some files or data rooms to continue.";

/// Application-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Persistent storage has no room left for the serialized state
    #[error("{0}")]
    QuotaExceeded(String),

    /// Data room, folder or file not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Folder move that would break the tree (self or descendant target)
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// Folder nesting deeper than the configured limit
    #[error("Folder depth limit exceeded: {0}")]
    DepthLimitExceeded(String),

    /// Upload rejected by the upload policy
    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Quota error carrying the standard user-facing message.
    pub fn quota_exceeded() -> Self {
        AppError::QuotaExceeded(QUOTA_EXCEEDED_MESSAGE.to_string())
    }

    /// Check if this error is a storage quota failure.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppError::QuotaExceeded(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::QuotaExceeded(msg) => {
                tracing::warn!("Storage quota exceeded");
                (StatusCode::INSUFFICIENT_STORAGE, msg.clone())
            }
            AppError::NotFound(msg) => {
                tracing::debug!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, msg.clone())
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::InvalidMove(msg) => {
                tracing::warn!("Invalid move: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::DepthLimitExceeded(msg) => {
                tracing::warn!("Depth limit exceeded: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::UnsupportedFile(msg) => {
                tracing::warn!("Unsupported file: {}", msg);
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
