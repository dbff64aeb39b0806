use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::InferenceError;
use schema::ErrorResponse;
use std::time::Duration;
use thiserror::Error;

/// Request faults, detected before the detector is invoked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("Invalid file type. Please upload an image.")]
    BadContentType(Option<String>),

    #[error("Invalid image data: {0}")]
    UndecodableImage(String),

    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Request body exceeds the {0} byte limit")]
    PayloadTooLarge(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("Model not loaded or failed to load. Cannot perform detection.")]
    NotReady,

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error("Error processing image: {0}")]
    InferenceFailure(String),

    #[error("Detection timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl DetectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            DetectError::InvalidInput(InvalidInput::PayloadTooLarge(_)) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            DetectError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DetectError::InferenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DetectError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Label used for the request outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            DetectError::NotReady => "not_ready",
            DetectError::InvalidInput(_) => "invalid_input",
            DetectError::InferenceFailure(_) => "inference_failure",
            DetectError::Timeout(_) => "timeout",
        }
    }
}

impl From<InferenceError> for DetectError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::NotReady => DetectError::NotReady,
            // Flatten to one line so the detail never leaks a multi-line chain
            other => DetectError::InferenceFailure(
                other.to_string().lines().next().unwrap_or_default().to_string(),
            ),
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            DetectError::InferenceFailure(_) | DetectError::Timeout(_) => {
                tracing::error!(status = status.as_u16(), error = %self, "Detection request failed");
            }
            _ => {
                tracing::warn!(status = status.as_u16(), error = %self, "Detection request rejected");
            }
        }

        let body = ErrorResponse {
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
