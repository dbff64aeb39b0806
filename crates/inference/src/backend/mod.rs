use crate::config::DetectorConfig;
use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// A loaded model that can run one forward pass at a time.
///
/// `infer` takes `&mut self`; callers sharing a backend across threads must
/// serialize access (see [`crate::detector::YoloDetector`]).
pub trait InferenceBackend: Send {
    fn load_model(config: &DetectorConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a `[1, 3, H, W]` input tensor
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, 4 + num_classes, anchors] cxcywh (input pixels) + class scores
}
