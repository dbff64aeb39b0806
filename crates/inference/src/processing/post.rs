use crate::detection::RawDetection;
use common::span_debug;
use preprocess::Letterbox;

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode YOLO predictions into detections in source-image pixels.
    ///
    /// Accepts `[1, 4 + nc, anchors]` (Ultralytics default) or the transposed
    /// `[1, anchors, 4 + nc]`; the smaller trailing axis is taken as the
    /// channel axis. Output is sorted by descending confidence.
    #[tracing::instrument(skip_all)]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        letterbox: &Letterbox,
    ) -> anyhow::Result<Vec<RawDetection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 {
            anyhow::bail!("Expected prediction shape [1, C, N], got {:?}", shape);
        }

        let channels_first = shape[1] <= shape[2];
        let (num_channels, num_anchors) = if channels_first {
            (shape[1], shape[2])
        } else {
            (shape[2], shape[1])
        };

        if num_channels < 5 {
            anyhow::bail!(
                "Prediction has {} channels, need 4 box coordinates plus at least one class",
                num_channels
            );
        }

        let at = |channel: usize, anchor: usize| -> f32 {
            if channels_first {
                predictions[[0, channel, anchor]]
            } else {
                predictions[[0, anchor, channel]]
            }
        };

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            // argmax over class scores
            let mut confidence = f32::NEG_INFINITY;
            let mut class_idx = 0usize;
            for c in 4..num_channels {
                let score = at(c, i);
                if score > confidence {
                    confidence = score;
                    class_idx = c - 4;
                }
            }

            if confidence.is_nan() || confidence < self.confidence_threshold {
                continue;
            }

            let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
            // Non-finite coordinates or empty extents
            if ![cx, cy, w, h].iter().all(|v| v.is_finite()) || w <= 0.0 || h <= 0.0 {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(cx, cy, w, h);

            candidates.push(RawDetection {
                x1,
                y1,
                x2,
                y2,
                confidence: confidence.min(1.0),
                class_id: class_idx as u32,
            });
        }

        let kept = self.non_max_suppression(candidates);

        Ok(kept
            .into_iter()
            .map(|det| to_source_pixels(det, letterbox))
            .collect())
    }

    /// Class-aware greedy NMS. Ties in confidence keep anchor order.
    fn non_max_suppression(&self, mut candidates: Vec<RawDetection>) -> Vec<RawDetection> {
        let _s = span_debug!("non_max_suppression");

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut kept: Vec<RawDetection> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.max_detections {
                break;
            }

            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id && k.iou(&candidate) > self.iou_threshold
            });

            if !suppressed {
                kept.push(candidate);
            }
        }

        kept
    }
}

/// Apply inverse letterbox transform and clamp into the source image.
fn to_source_pixels(det: RawDetection, letterbox: &Letterbox) -> RawDetection {
    let max_x = letterbox.orig_width as f32;
    let max_y = letterbox.orig_height as f32;

    let (x1, y1) = letterbox.to_source(det.x1, det.y1);
    let (x2, y2) = letterbox.to_source(det.x2, det.y2);

    RawDetection {
        x1: x1.clamp(0.0, max_x),
        y1: y1.clamp(0.0, max_y),
        x2: x2.clamp(0.0, max_x),
        y2: y2.clamp(0.0, max_y),
        ..det
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
