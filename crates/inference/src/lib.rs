pub mod backend;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod labels;
pub mod manager;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{DetectorConfig, ExecutionProvider};
pub use detection::{Detection, DetectionResult, RawDetection};
pub use detector::{Detector, YoloDetector};
pub use error::InferenceError;
pub use labels::LabelTable;
pub use manager::{DetectorState, InferenceEngine, ModelManager};
