use preprocess::DEFAULT_INPUT_SIZE;
use serde::Deserialize;

pub const DEFAULT_MODEL_PATH: &str = "/app/models/best.onnx";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

/// Everything needed to build a detector from weights on disk.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: String,
    /// Newline-separated class names; COCO-80 when unset.
    pub labels_path: Option<String>,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    pub input_size: (u32, u32),
    /// Detector-internal score cutoff, applied before NMS.
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl DetectorConfig {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: None,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 4,
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}
