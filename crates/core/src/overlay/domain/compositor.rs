use image::RgbImage;

use crate::overlay::domain::layers::OverlayLayers;
use crate::overlay::domain::viewport::Viewport;

/// Flattens a layer stack over the upright preview image.
///
/// The result is `viewport`-sized. Called from the UI context only.
pub trait Compositor {
    fn compose(
        &mut self,
        base: &RgbImage,
        layers: &OverlayLayers,
        viewport: &Viewport,
    ) -> RgbImage;
}
