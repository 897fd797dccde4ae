use crate::detection::domain::object_model::{ModelError, ObjectModel, RegionObservation};
use crate::detection::domain::orientation::Orientation;
use crate::detection::domain::prediction::Prediction;
use crate::detection::domain::thresholds::ThresholdSource;
use crate::shared::frame::Frame;

/// Maps model observations for one frame into a flat prediction list.
///
/// Fail-soft: a detector whose model failed to load returns no predictions
/// for every frame, and a failed inference yields an empty list for that
/// frame. Neither case is retried.
pub struct Detector {
    model: Option<Box<dyn ObjectModel>>,
    orientation: Orientation,
    thresholds: ThresholdSource,
}

impl Detector {
    pub fn new(
        model: Box<dyn ObjectModel>,
        orientation: Orientation,
        thresholds: ThresholdSource,
    ) -> Self {
        Self {
            model: Some(model),
            orientation,
            thresholds,
        }
    }

    /// Builds a detector from a model load attempt, degrading on failure.
    pub fn from_load_result(
        model: Result<Box<dyn ObjectModel>, ModelError>,
        orientation: Orientation,
        thresholds: ThresholdSource,
    ) -> Self {
        match model {
            Ok(model) => Self::new(model, orientation, thresholds),
            Err(e) => {
                log::error!("Error initializing model: {e}; detections are disabled");
                Self {
                    model: None,
                    orientation,
                    thresholds,
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.model.is_none()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn detect(&self, frame: &Frame) -> Vec<Prediction> {
        let Some(model) = self.model.as_ref() else {
            return Vec::new();
        };

        let thresholds = self.thresholds.resolve();
        match model.infer(frame, self.orientation, &thresholds) {
            Ok(observations) => top1_predictions(observations),
            Err(e) => {
                log::warn!("Failed to perform detection on frame {}: {e}", frame.index());
                Vec::new()
            }
        }
    }
}

/// Keeps the highest-scoring label of each region. Regions without any
/// label candidate are dropped.
fn top1_predictions(observations: Vec<RegionObservation>) -> Vec<Prediction> {
    observations
        .into_iter()
        .filter_map(|obs| {
            let bbox = obs.bounding_box;
            obs.labels
                .into_iter()
                .max_by(|a, b| {
                    a.confidence
                        .partial_cmp(&b.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|top| Prediction::new(top.identifier, bbox, top.confidence))
        })
        .collect()
}
