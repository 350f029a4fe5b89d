//! Common error types for the imaging gateway and the artifact store

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    /// Neither an image nor a prompt, malformed fields, or a mode the endpoint does not serve
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote source image could not be fetched or decoded
    #[error("Failed to fetch input image: {0}")]
    ImageFetch(String),

    /// Uploaded bytes are not a decodable image
    #[error("Invalid input image: {0}")]
    InvalidImage(String),

    #[error("Backend error: {0}")]
    Backend(String),

    /// URL delivery requested but the artifact store is missing or unreachable
    #[error("Artifact store unavailable: {0}")]
    ArtifactStore(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format (OpenAI compatible)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.classify().0
    }

    fn classify(&self) -> (StatusCode, &'static str, Option<&'static str>) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Json(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_json")),
            AppError::Image(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", Some("encoding_failed")),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            AppError::ImageFetch(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("image_fetch_failed")),
            AppError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_image")),
            AppError::Backend(_) => (StatusCode::BAD_GATEWAY, "backend_error", None),
            AppError::ArtifactStore(_) => (StatusCode::SERVICE_UNAVAILABLE, "configuration_error", Some("artifact_store_unavailable")),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication_error", Some("missing_bearer_token")),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "permission_error", Some("invalid_bearer_token")),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.classify();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
