use std::path::PathBuf;

use thiserror::Error;

use crate::detection::domain::orientation::Orientation;
use crate::detection::domain::thresholds::ThresholdConfig;
use crate::shared::frame::Frame;
use crate::shared::normalized_rect::NormalizedRect;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model from {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    Output(String),
    #[error("frame has no pixels")]
    EmptyFrame,
}

/// One class hypothesis for a region.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelCandidate {
    pub identifier: String,
    pub confidence: f64,
}

/// A detected region as reported by the model, before top-1 selection.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionObservation {
    /// Sorted by descending confidence.
    pub labels: Vec<LabelCandidate>,
    pub bounding_box: NormalizedRect,
}

impl RegionObservation {
    pub fn top_label(&self) -> Option<&LabelCandidate> {
        self.labels.first()
    }
}

/// Domain interface for a pretrained object-detection model.
///
/// Implementations filter by `thresholds.confidence_threshold` and suppress
/// overlapping boxes with `thresholds.iou_threshold`. Bounding boxes are
/// relative to the upright image (after applying `orientation`).
pub trait ObjectModel: Send + Sync {
    fn infer(
        &self,
        frame: &Frame,
        orientation: Orientation,
        thresholds: &ThresholdConfig,
    ) -> Result<Vec<RegionObservation>, ModelError>;
}
