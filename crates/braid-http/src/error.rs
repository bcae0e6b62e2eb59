//! API error types and HTTP responses.

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use braid_engine::EngineError;

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// Malformed request (bad multipart body, missing query parameter).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An error from the storage engine.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl ApiError {
    /// Map to a status code and user-visible message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or missing bearer token".to_string(),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Engine(e) => match e {
                EngineError::AlreadyExists { .. } => {
                    (StatusCode::BAD_REQUEST, "File already exists".to_string())
                }
                EngineError::NotFound { .. } => (
                    StatusCode::NOT_FOUND,
                    "File not found or shards missing".to_string(),
                ),
                EngineError::Unrecoverable { .. } => (
                    StatusCode::BAD_REQUEST,
                    "Not enough shards to reconstruct the file".to_string(),
                ),
                EngineError::InvalidFilename => {
                    (StatusCode::BAD_REQUEST, "Invalid filename".to_string())
                }
                other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        Response::builder()
            .status(status)
            .header("content-type", "text/plain; charset=utf-8")
            .body(Body::from(message))
            .expect("static response")
    }
}
