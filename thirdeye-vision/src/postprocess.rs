//! Decoding and reduction of raw network output
//!
//! Takes the per-layer tensors produced by the detection network and turns
//! them into a clean, ordered set of pixel-space detections: confidence
//! filtering, non-maximum suppression, and best-label selection.

use crate::config::DetectionParams;
use crate::error::VisionError;
use tracing::debug;

/// Number of box/objectness terms preceding the class scores in a row.
const CLASS_SCORE_OFFSET: usize = 5;

/// One output layer of the network, flattened row-major.
///
/// Each row is `[cx, cy, w, h, objectness, class scores...]` with the box
/// terms normalized to [0, 1] relative to the network input.
#[derive(Debug, Clone)]
pub struct RawLayer {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

/// Raw per-layer output of one inference pass.
#[derive(Debug, Clone, Default)]
pub struct RawDetections {
    pub layers: Vec<RawLayer>,
}

impl RawDetections {
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.rows == 0)
    }
}

/// Axis-aligned box in pixel units of the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A decoded detection candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Decode raw layers into pixel-space detections above the confidence
/// threshold.
///
/// For each candidate row the class with the maximum score wins; candidates
/// whose top score is at or below the threshold are dropped (the boundary
/// value itself is excluded). Rows whose winning class has no entry in
/// `labels` are dropped as well.
pub fn decode_detections(
    raw: &RawDetections,
    frame_width: u32,
    frame_height: u32,
    labels: &[String],
    params: &DetectionParams,
) -> Result<Vec<Detection>, VisionError> {
    let frame_w = frame_width as f32;
    let frame_h = frame_height as f32;

    let mut detections = Vec::new();

    for (layer_idx, layer) in raw.layers.iter().enumerate() {
        if layer.rows == 0 {
            continue;
        }

        if layer.cols <= CLASS_SCORE_OFFSET {
            return Err(VisionError::Decode(format!(
                "Layer {} has {} columns, expected at least {}",
                layer_idx,
                layer.cols,
                CLASS_SCORE_OFFSET + 1
            )));
        }

        let expected = layer
            .rows
            .checked_mul(layer.cols)
            .ok_or_else(|| VisionError::Decode("Layer shape overflow".to_string()))?;
        if layer.data.len() != expected {
            return Err(VisionError::Decode(format!(
                "Layer {} holds {} values, expected {}x{}",
                layer_idx,
                layer.data.len(),
                layer.rows,
                layer.cols
            )));
        }

        for row in layer.data.chunks_exact(layer.cols) {
            let scores = &row[CLASS_SCORE_OFFSET..];

            let mut class_id = 0usize;
            let mut confidence = 0.0f32;
            for (idx, &score) in scores.iter().enumerate() {
                if score > confidence {
                    confidence = score;
                    class_id = idx;
                }
            }

            if !confidence.is_finite() || confidence <= params.confidence_threshold {
                continue;
            }

            if class_id >= labels.len() {
                continue;
            }

            let center_x = row[0] * frame_w;
            let center_y = row[1] * frame_h;
            let width = row[2] * frame_w;
            let height = row[3] * frame_h;

            if !center_x.is_finite() || !center_y.is_finite() || !width.is_finite() || !height.is_finite() {
                continue;
            }

            detections.push(Detection {
                class_id,
                label: labels[class_id].clone(),
                confidence,
                bbox: BoundingBox {
                    x: center_x - width / 2.0,
                    y: center_y - height / 2.0,
                    width,
                    height,
                },
            });
        }
    }

    debug!("Decoded {} candidates above threshold", detections.len());
    Ok(detections)
}

/// Greedy non-maximum suppression across all classes.
///
/// Candidates are stably sorted by descending confidence (equal confidences
/// keep their original order), then each kept detection suppresses every
/// remaining one whose IoU with it exceeds the threshold. The result stays
/// ordered by descending confidence.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.retain(|d| d.confidence.is_finite() && d.confidence >= 0.0 && d.confidence <= 1.0);
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        for j in (i + 1)..detections.len() {
            if suppressed[j] {
                continue;
            }

            if iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }

        keep.push(detections[i].clone());
    }

    keep
}

/// Label of the highest-confidence survivor, or the empty string.
pub fn best_label(detections: &[Detection]) -> String {
    detections
        .first()
        .map(|d| d.label.clone())
        .unwrap_or_default()
}

/// Intersection-over-union of two boxes. Degenerate unions yield 0.0.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if a.width < 0.0 || a.height < 0.0 || b.width < 0.0 || b.height < 0.0 {
        return 0.0;
    }

    let a_max_x = a.x + a.width;
    let a_max_y = a.y + a.height;
    let b_max_x = b.x + b.width;
    let b_max_y = b.y + b.height;

    let inter_min_x = a.x.max(b.x);
    let inter_min_y = a.y.max(b.y);
    let inter_max_x = a_max_x.min(b_max_x);
    let inter_max_y = a_max_y.min(b_max_y);

    if inter_max_x <= inter_min_x || inter_max_y <= inter_min_y {
        return 0.0;
    }

    let inter_area = (inter_max_x - inter_min_x) * (inter_max_y - inter_min_y);
    let union_area = a.width * a.height + b.width * b.height - inter_area;

    if union_area <= 0.0 || !union_area.is_finite() {
        return 0.0;
    }

    let ratio = inter_area / union_area;
    if ratio.is_finite() && (0.0..=1.0).contains(&ratio) {
        ratio
    } else {
        0.0
    }
}
