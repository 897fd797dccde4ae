use crate::detection::domain::prediction::Prediction;
use crate::overlay::domain::layers::{Layer, OverlayLayers};
use crate::overlay::domain::viewport::{to_screen_rect, Viewport};

/// Rebuilds the overlay layer stack from scratch for each prediction set.
///
/// Every call clears all layers above the base, then adds one box outline
/// and one caption per prediction in input order. Nothing carries over
/// between calls and nothing is deduplicated.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    layers: OverlayLayers,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, predictions: &[Prediction], viewport: &Viewport) -> &OverlayLayers {
        self.layers.clear_overlays();
        for prediction in predictions {
            let rect = to_screen_rect(&prediction.bbox, viewport);
            self.layers.push(Layer::box_outline(rect));
            self.layers.push(Layer::label(prediction.label_text(), &rect));
        }
        &self.layers
    }
}
