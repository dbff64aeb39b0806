use crate::error::{DetectError, InvalidInput};
use axum::body::Bytes;
use image::{DynamicImage, ImageError};
use inference::{Detection as LabelledDetection, InferenceEngine};
use schema::{Detection, DetectionResponse};
use std::sync::Arc;

/// An uploaded image as it arrived: bytes plus the declared media type.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl DetectionRequest {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Turns encoded image bytes into a raster.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError>;
}

/// Decodes any format compiled into `image`, sniffing it from the magic bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuessFormatDecoder;

impl ImageDecoder for GuessFormatDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        image::load_from_memory(bytes)
    }
}

/// `true` when the declared media type is an `image/*` type.
pub fn is_image_media_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Stateless request pipeline: readiness gate, media-type check, decode,
/// detect, then conversion to the wire schema.
///
/// Blocking. Callers on an async runtime should run [`handle`](Self::handle)
/// on the blocking pool.
#[derive(Clone)]
pub struct DetectionHandler {
    engine: Arc<dyn InferenceEngine>,
    decoder: Arc<dyn ImageDecoder>,
}

impl DetectionHandler {
    pub fn new(engine: Arc<dyn InferenceEngine>) -> Self {
        Self::with_decoder(engine, Arc::new(GuessFormatDecoder))
    }

    pub fn with_decoder(engine: Arc<dyn InferenceEngine>, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self { engine, decoder }
    }

    pub fn engine(&self) -> &dyn InferenceEngine {
        self.engine.as_ref()
    }

    pub fn ensure_ready(&self) -> Result<(), DetectError> {
        if self.engine.is_ready() {
            Ok(())
        } else {
            Err(DetectError::NotReady)
        }
    }

    pub fn handle(&self, request: &DetectionRequest) -> Result<DetectionResponse, DetectError> {
        self.ensure_ready()?;

        if !is_image_media_type(request.content_type.as_deref()) {
            return Err(InvalidInput::BadContentType(request.content_type.clone()).into());
        }

        let image = self
            .decoder
            .decode(&request.bytes)
            .map_err(|e| InvalidInput::UndecodableImage(e.to_string()))?;

        tracing::debug!(
            bytes = request.bytes.len(),
            width = image.width(),
            height = image.height(),
            "Image decoded"
        );

        let detections = self.engine.detect(&image)?;

        let detections = detections
            .into_iter()
            .map(to_wire)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DetectionResponse { detections })
    }
}

/// Convert a labelled detection to its wire form, rejecting values no renderer can draw.
fn to_wire(detection: LabelledDetection) -> Result<Detection, DetectError> {
    let [x_min, y_min, x_max, y_max] = detection.bbox;

    let malformed = |reason: &str| {
        Err(DetectError::InferenceFailure(format!(
            "Detector returned a malformed detection: {}",
            reason
        )))
    };

    if !detection.bbox.iter().all(|v| v.is_finite()) {
        return malformed("non-finite box coordinate");
    }
    if x_min > x_max || y_min > y_max {
        return malformed("inverted box");
    }
    if !(0.0..=1.0).contains(&detection.confidence) {
        return malformed("confidence outside [0, 1]");
    }
    if detection.class_name.is_empty() {
        return malformed("empty class name");
    }

    Ok(Detection {
        bbox: detection.bbox,
        confidence: detection.confidence,
        class_id: detection.class_id,
        class_name: detection.class_name,
    })
}
