use std::path::PathBuf;

use crate::settings::Settings;
use crate::shared::constants::{FIXED_CONFIDENCE_THRESHOLD, FIXED_IOU_THRESHOLD};

/// Thresholds handed to the model for a single inference call.
///
/// Passed by value on every call; nothing shared is mutated in between.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdConfig {
    /// Overlap above which a lower-scoring box of the same class is suppressed.
    pub iou_threshold: f64,
    /// Minimum top-label score for a region to be reported.
    pub confidence_threshold: f64,
}

impl ThresholdConfig {
    pub fn new(iou_threshold: f64, confidence_threshold: f64) -> Self {
        Self {
            iou_threshold,
            confidence_threshold,
        }
    }

    /// IoU 0.7 / confidence 0.5.
    pub fn fixed() -> Self {
        Self::new(FIXED_IOU_THRESHOLD, FIXED_CONFIDENCE_THRESHOLD)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::fixed()
    }
}

impl From<Settings> for ThresholdConfig {
    fn from(settings: Settings) -> Self {
        Self::new(settings.iou_threshold, settings.confidence_threshold)
    }
}

/// Where the detector takes its thresholds from.
#[derive(Clone, Debug, PartialEq)]
pub enum ThresholdSource {
    /// Constant values, independent of user configuration.
    Fixed(ThresholdConfig),
    /// Read from the settings file each time thresholds are needed.
    Persisted(PathBuf),
}

impl ThresholdSource {
    pub fn resolve(&self) -> ThresholdConfig {
        match self {
            ThresholdSource::Fixed(config) => *config,
            ThresholdSource::Persisted(path) => Settings::load_or_default(path).into(),
        }
    }
}

impl Default for ThresholdSource {
    fn default() -> Self {
        ThresholdSource::Fixed(ThresholdConfig::fixed())
    }
}
