//! Error types for fablecast-np
//!
//! Defines the pipeline error taxonomy using thiserror, plus the API-facing
//! error wrapper that maps pipeline failures to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the narration pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid request fields; surfaced directly to the caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// Classifier call failed or returned unparsable output (fails the batch)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Speech provider returned a non-success response
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// No instrumental track matches the requested mood bucket
    #[error("No background music available: {0}")]
    MusicUnavailable(String),

    /// Unreadable or corrupt audio segments handed to the mixer
    #[error("Mix error: {0}")]
    Mix(String),

    /// Zero-length segment, sample-rate mismatch, or container write failure
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Storage collaborator failure (retried with backoff before surfacing)
    #[error("Upload error: {0}")]
    Upload(String),

    /// File I/O error (scratch storage)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job cancelled because a sibling stage failed
    #[error("Job cancelled: {0}")]
    Cancelled(String),

    /// Other internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<fablecast_common::Error> for Error {
    fn from(e: fablecast_common::Error) -> Self {
        match e {
            fablecast_common::Error::Io(io) => Error::Io(io),
            fablecast_common::Error::Config(msg) => Error::Config(msg),
            fablecast_common::Error::InvalidInput(msg) => Error::Validation(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}

/// Convenience Result type using the pipeline Error
pub type Result<T> = std::result::Result<T, Error>;

/// API error wrapper mapping pipeline errors to HTTP responses
///
/// Validation errors surface verbatim as 400s. Pipeline stage failures are
/// logged with stage context where they occur and surface as 500s with the
/// typed code preserved in the body.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::Classification(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CLASSIFICATION_ERROR"),
            Error::Synthesis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SYNTHESIS_ERROR"),
            Error::MusicUnavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MUSIC_UNAVAILABLE"),
            Error::Mix(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MIX_ERROR"),
            Error::Encoding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCODING_ERROR"),
            Error::Upload(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Cancelled(_) => (StatusCode::INTERNAL_SERVER_ERROR, "JOB_CANCELLED"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let resp = ApiError(Error::Validation("text is required".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_stage_failures_map_to_500() {
        for err in [
            Error::Classification("bad json".into()),
            Error::Synthesis("provider 503".into()),
            Error::MusicUnavailable("no tense bucket".into()),
            Error::Mix("corrupt segment".into()),
            Error::Encoding("zero-length segment".into()),
            Error::Upload("store unreachable".into()),
        ] {
            let resp = ApiError(err).into_response();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_common_error_conversion() {
        let err: Error = fablecast_common::Error::InvalidInput("bad".into()).into();
        assert!(matches!(err, Error::Validation(_)));

        let err: Error = fablecast_common::Error::Config("missing".into()).into();
        assert!(matches!(err, Error::Config(_)));
    }
}
