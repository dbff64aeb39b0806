use crate::{handler::DetectionHandler, metrics::DetectMetrics};
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub handler: DetectionHandler,
    pub metrics: DetectMetrics,
    /// Upper bound on decode plus inference for one request.
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(handler: DetectionHandler, request_timeout: Duration, max_body_bytes: usize) -> Self {
        Self {
            handler,
            metrics: DetectMetrics::new(),
            request_timeout,
            max_body_bytes,
        }
    }
}
