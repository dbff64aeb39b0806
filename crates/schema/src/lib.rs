//! JSON wire contract shared by the detection service and its renderers.
//!
//! A success body always carries `detections`; every failure body carries `detail`.
//! Clients can tell the two apart by field presence alone.

use serde::{Deserialize, Serialize};

/// One detected object as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x_min, y_min, x_max, y_max]` in pixels of the decoded image.
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: String,
}

/// Success envelope for `POST /detect`. Empty `detections` means "nothing found".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
}

/// Failure envelope shared by every error status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Body of the `GET /` liveness route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

/// Body of the `GET /health` readiness route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Load error, present only when the model failed to load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
