use crate::{
    backend::{InferenceBackend, InferenceOutput},
    config::DetectorConfig,
    detection::RawDetection,
    error::InferenceError,
    labels::LabelTable,
    processing::PostProcessor,
};
use image::DynamicImage;
use parking_lot::Mutex;
use preprocess::{CpuPreProcessor, Preprocess, PreprocessResult};

/// The object-recognition collaborator: image in, raw detections out.
///
/// Implementations must be callable from many threads at once.
pub trait Detector: Send + Sync {
    /// Run one forward pass on a decoded image. Boxes are in that image's pixels.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, InferenceError>;

    /// Look up a class id in this detector's label table.
    fn class_name(&self, class_id: u32) -> Option<&str>;
}

/// YOLO detector over any [`InferenceBackend`].
///
/// The backend needs exclusive access per run, so it sits behind a mutex held
/// only for the forward pass. Letterboxing and NMS run outside the lock.
pub struct YoloDetector<B: InferenceBackend> {
    backend: Mutex<B>,
    preprocessor: CpuPreProcessor,
    postprocessor: PostProcessor,
    labels: LabelTable,
}

impl<B: InferenceBackend> YoloDetector<B> {
    pub fn new(backend: B, labels: LabelTable, config: &DetectorConfig) -> Self {
        Self {
            backend: Mutex::new(backend),
            preprocessor: CpuPreProcessor::new(config.input_size),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            labels,
        }
    }

    pub fn load(config: &DetectorConfig) -> anyhow::Result<Self> {
        let labels = LabelTable::load(config.labels_path.as_deref())?;
        tracing::info!(classes = labels.len(), "Label table loaded");

        let backend = B::load_model(config)?;

        Ok(Self::new(backend, labels, config))
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }
}

impl<B: InferenceBackend> Detector for YoloDetector<B> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, InferenceError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let PreprocessResult { tensor, letterbox } = self
            .preprocessor
            .preprocess(rgb.as_raw(), width, height)
            .map_err(|e| InferenceError::runtime(&e))?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            let mut backend = self.backend.lock();
            backend.infer(&tensor)
        }
        .map_err(|e| InferenceError::runtime(&e))?;

        let detections = self
            .postprocessor
            .parse_detections(&predictions.view(), &letterbox)
            .map_err(|e| InferenceError::InvalidOutput(format!("{:#}", e)))?;

        tracing::debug!(width, height, detections = detections.len(), "Detector pass");

        Ok(detections)
    }

    fn class_name(&self, class_id: u32) -> Option<&str> {
        self.labels.get(class_id)
    }
}
