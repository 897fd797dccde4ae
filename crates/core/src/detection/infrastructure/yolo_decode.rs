//! Pre- and post-processing for ultralytics-style YOLO detection heads.
//!
//! Kept free of ONNX Runtime types so the tensor math can be tested on its
//! own.

use image::RgbImage;
use ndarray::Array4;

use crate::detection::domain::object_model::{LabelCandidate, RegionObservation};
use crate::detection::infrastructure::labels::LabelSet;
use crate::shared::normalized_rect::NormalizedRect;

/// Number of box values ahead of the class scores in each anchor row.
const BOX_VALUES: usize = 4;

/// Label candidates reported per region, best first.
pub const MAX_LABEL_CANDIDATES: usize = 5;

/// YOLO letterbox padding value (114 gray).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Model input tensor plus the mapping back to source pixels.
pub struct Letterbox {
    pub tensor: Array4<f32>,
    pub scale: f64,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    /// Maps a point from model input space back to source image pixels.
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize `image` to `target_size` x `target_size` as an NCHW
/// float tensor in `[0, 1]`.
pub fn letterbox(image: &RgbImage, target_size: u32) -> Letterbox {
    let (src_w, src_h) = image.dimensions();
    let target = target_size as f64;

    let scale = (target / src_w as f64).min(target / src_h as f64);
    let new_w = ((src_w as f64 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((src_h as f64 * scale).round() as u32).clamp(1, target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    // Nearest-neighbor resample into the padded region.
    for y in 0..new_h {
        let src_y = ((y as f64 / scale) as u32).min(src_h - 1);
        for x in 0..new_w {
            let src_x = ((x as f64 / scale) as u32).min(src_w - 1);
            let pixel = image.get_pixel(src_x, src_y);
            let ty = (pad_y + y) as usize;
            let tx = (pad_x + x) as usize;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    Letterbox {
        tensor,
        scale,
        pad_x,
        pad_y,
    }
}

/// A decoded anchor that passed the confidence threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    /// `(class_id, score)` sorted by descending score.
    pub classes: Vec<(usize, f64)>,
    pub bbox: NormalizedRect,
}

impl RawDetection {
    fn top_class(&self) -> Option<(usize, f64)> {
        self.classes.first().copied()
    }
}

/// Decodes a `[1, 4 + C, N]` (or `[1, N, 4 + C]`) YOLO output.
///
/// Boxes are `(cx, cy, w, h)` in letterboxed input pixels; the result is
/// normalized to the upright source image of `image_w` x `image_h`.
pub fn decode(
    data: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    image_w: u32,
    image_h: u32,
    confidence_threshold: f64,
) -> Result<Vec<RawDetection>, String> {
    if shape.len() != 3 {
        return Err(format!("expected a rank-3 output, got shape {shape:?}"));
    }
    // Features-first layout when the feature axis is the shorter one.
    let features_first = shape[1] < shape[2];
    let (num_anchors, num_features) = if features_first {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_features <= BOX_VALUES {
        return Err(format!("output has no class scores, shape {shape:?}"));
    }
    if data.len() < num_anchors * num_features {
        return Err(format!(
            "output holds {} values, shape {shape:?} needs {}",
            data.len(),
            num_anchors * num_features
        ));
    }

    let value = |anchor: usize, feature: usize| -> f64 {
        let idx = if features_first {
            feature * num_anchors + anchor
        } else {
            anchor * num_features + feature
        };
        data[idx] as f64
    };

    let num_classes = num_features - BOX_VALUES;
    let mut detections = Vec::new();
    for anchor in 0..num_anchors {
        let mut classes: Vec<(usize, f64)> = (0..num_classes)
            .map(|c| (c, value(anchor, BOX_VALUES + c)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        classes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        match classes.first() {
            Some(&(_, best)) if best >= confidence_threshold => {}
            _ => continue,
        }
        classes.truncate(MAX_LABEL_CANDIDATES);

        let cx = value(anchor, 0);
        let cy = value(anchor, 1);
        let w = value(anchor, 2);
        let h = value(anchor, 3);
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);

        detections.push(RawDetection {
            classes,
            bbox: NormalizedRect::from_top_left_corners(
                (x1, y1, x2, y2),
                image_w as f64,
                image_h as f64,
            ),
        });
    }

    Ok(detections)
}

/// Greedy per-class NMS: a box is suppressed when it overlaps a higher
/// scoring box of the same top class by more than `iou_threshold`.
/// Detections without any class are dropped.
pub fn nms(detections: Vec<RawDetection>, iou_threshold: f64) -> Vec<RawDetection> {
    let mut ranked: Vec<((usize, f64), RawDetection)> = detections
        .into_iter()
        .filter_map(|det| det.top_class().map(|top| (top, det)))
        .collect();
    ranked.sort_by(|(a, _), (b, _)| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<((usize, f64), RawDetection)> = Vec::with_capacity(ranked.len());
    for (top, det) in ranked {
        let suppressed = keep
            .iter()
            .any(|(k_top, k)| k_top.0 == top.0 && k.bbox.iou(&det.bbox) > iou_threshold);
        if !suppressed {
            keep.push((top, det));
        }
    }
    keep.into_iter().map(|(_, det)| det).collect()
}

pub fn to_observations(detections: Vec<RawDetection>, labels: &LabelSet) -> Vec<RegionObservation> {
    detections
        .into_iter()
        .map(|det| RegionObservation {
            labels: det
                .classes
                .into_iter()
                .map(|(class_id, score)| LabelCandidate {
                    identifier: labels.name(class_id),
                    confidence: score,
                })
                .collect(),
            bounding_box: det.bbox,
        })
        .collect()
}
