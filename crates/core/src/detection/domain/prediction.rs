use serde::{Deserialize, Serialize};

use crate::shared::normalized_rect::NormalizedRect;

/// One detected object: top-1 label, normalized box and score.
///
/// Created per detection and dropped once rendered. There is no identity
/// across frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub bbox: NormalizedRect,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, bbox: NormalizedRect, confidence: f64) -> Self {
        Self {
            label: label.into(),
            bbox,
            confidence,
        }
    }

    /// Overlay caption, e.g. `"person 0.91"`.
    pub fn label_text(&self) -> String {
        format!("{} {:.2}", self.label, self.confidence)
    }
}
