use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Service-wide error taxonomy. Every variant maps to one HTTP status and a
/// `{"error": "..."}` body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or missing input. Never creates a job directory.
    #[error("{0}")]
    Validation(String),

    /// Bad or missing bearer credential.
    #[error("Unauthorized: Invalid API Key")]
    Auth,

    /// Unknown or expired id. Deliberately does not distinguish the two.
    #[error("File not found or has expired")]
    NotFound,

    /// Unachievable bitrate or encoder failure.
    #[error("{0}")]
    Encode(String),

    /// Filesystem failure creating or reading job state.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Encode("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_never_mentions_expiry_state() {
        // Same message for "never existed" and "expired".
        assert_eq!(AppError::NotFound.to_string(), "File not found or has expired");
    }
}
