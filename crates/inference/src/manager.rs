use crate::{
    config::DetectorConfig,
    detection::{Detection, DetectionResult},
    detector::Detector,
    error::InferenceError,
};
use image::DynamicImage;
use std::sync::OnceLock;
use std::time::Instant;

/// Lifecycle of the process-wide detector. Set once, never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Uninitialized,
    Ready,
    Failed,
}

impl DetectorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorState::Uninitialized => "uninitialized",
            DetectorState::Ready => "ready",
            DetectorState::Failed => "failed",
        }
    }
}

/// What the request path needs from a model: a readiness check and a labelled forward pass.
pub trait InferenceEngine: Send + Sync {
    fn state(&self) -> DetectorState;

    fn is_ready(&self) -> bool {
        self.state() == DetectorState::Ready
    }

    /// Why the model failed to load, when it did.
    fn failure(&self) -> Option<&str> {
        None
    }

    /// Precondition: `is_ready()`. Returns [`InferenceError::NotReady`] otherwise.
    fn detect(&self, image: &DynamicImage) -> Result<DetectionResult, InferenceError>;
}

enum Loaded {
    Ready(Box<dyn Detector>),
    Failed(String),
}

/// Owns the single detector handle for the life of the process.
///
/// Loading is attempted exactly once. A failed load is recorded, not
/// returned, and the manager stays `Failed` until the process restarts.
#[derive(Default)]
pub struct ModelManager {
    slot: OnceLock<Loaded>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the YOLO/ONNX Runtime detector described by `config`.
    #[cfg(feature = "ort-backend")]
    pub fn initialize(&self, config: &DetectorConfig) {
        use crate::{backend::ort::OrtBackend, detector::YoloDetector};

        tracing::info!(model_path = %config.model_path, "Loading detection model");
        self.initialize_with(|| {
            let detector = YoloDetector::<OrtBackend>::load(config)?;
            Ok(Box::new(detector) as Box<dyn Detector>)
        });
    }

    #[cfg(not(feature = "ort-backend"))]
    pub fn initialize(&self, config: &DetectorConfig) {
        tracing::info!(model_path = %config.model_path, "Loading detection model");
        self.initialize_with(|| anyhow::bail!("No inference backend compiled in"));
    }

    /// Run `load` once and absorb its outcome into the manager state.
    ///
    /// Later calls are ignored and `load` is not invoked.
    pub fn initialize_with<F>(&self, load: F)
    where
        F: FnOnce() -> anyhow::Result<Box<dyn Detector>>,
    {
        if self.slot.get().is_some() {
            tracing::warn!(state = self.state().as_str(), "Model already initialized, ignoring");
            return;
        }

        let start = Instant::now();
        let loaded = match load() {
            Ok(detector) => {
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model loaded successfully"
                );
                Loaded::Ready(detector)
            }
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "Error loading model during startup");
                tracing::warn!("Model could not be loaded. Detection requests will be rejected");
                Loaded::Failed(format!("{:#}", e))
            }
        };

        if self.slot.set(loaded).is_err() {
            tracing::warn!("Model initialized concurrently, keeping the first result");
        }
    }

    fn label(detector: &dyn Detector, raw: crate::RawDetection) -> Result<Detection, InferenceError> {
        let class_name = detector
            .class_name(raw.class_id)
            .ok_or(InferenceError::UnknownClass(raw.class_id))?;

        Ok(Detection {
            bbox: [raw.x1, raw.y1, raw.x2, raw.y2],
            confidence: raw.confidence,
            class_id: raw.class_id,
            class_name: class_name.to_string(),
        })
    }
}

impl InferenceEngine for ModelManager {
    fn state(&self) -> DetectorState {
        match self.slot.get() {
            None => DetectorState::Uninitialized,
            Some(Loaded::Ready(_)) => DetectorState::Ready,
            Some(Loaded::Failed(_)) => DetectorState::Failed,
        }
    }

    fn failure(&self) -> Option<&str> {
        match self.slot.get() {
            Some(Loaded::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    fn detect(&self, image: &DynamicImage) -> Result<DetectionResult, InferenceError> {
        let Some(Loaded::Ready(detector)) = self.slot.get() else {
            return Err(InferenceError::NotReady);
        };

        detector
            .detect(image)?
            .into_iter()
            .map(|raw| Self::label(detector.as_ref(), raw))
            .collect()
    }
}
