use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

const METER_NAME: &str = "gateway";

/// Instruments recorded by the detection route.
///
/// Without an installed meter provider the global meter is a no-op, so these
/// are always safe to record into.
#[derive(Clone)]
pub struct DetectMetrics {
    requests: Counter<u64>,
    inference_duration: Histogram<f64>,
    detections: Counter<u64>,
}

impl DetectMetrics {
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.5, 5.0, 10.0,
        ];

        Self {
            requests: meter
                .u64_counter("detect_requests_total")
                .with_description("Detection requests by outcome")
                .build(),
            inference_duration: meter
                .f64_histogram("detect_inference_duration_seconds")
                .with_description("Time spent decoding and running the detector per request")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            detections: meter
                .u64_counter("detect_detections_total")
                .with_description("Total detections returned")
                .build(),
        }
    }

    pub fn record_outcome(&self, outcome: &'static str) {
        self.requests.add(1, &[KeyValue::new("outcome", outcome)]);
    }

    pub fn record_inference(&self, elapsed: Duration, detections: usize) {
        self.inference_duration.record(elapsed.as_secs_f64(), &[]);
        self.detections.add(detections as u64, &[]);
    }
}

impl Default for DetectMetrics {
    fn default() -> Self {
        Self::new()
    }
}
