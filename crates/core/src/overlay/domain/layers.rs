use crate::overlay::domain::viewport::ScreenRect;

/// Box outline stroke width in points.
pub const BOX_STROKE_WIDTH: f64 = 4.0;

/// Caption font size in points.
pub const LABEL_FONT_SIZE: f64 = 15.0;

/// Caption frame size and its offset above the box's top edge.
pub const LABEL_FRAME_WIDTH: f64 = 200.0;
pub const LABEL_FRAME_HEIGHT: f64 = 50.0;
pub const LABEL_OFFSET_Y: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// One drawable entry of the preview's layer stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// The camera preview. Always at index 0.
    Base,
    /// Unfilled stroked rectangle around a detection.
    BoxOutline {
        rect: ScreenRect,
        stroke_width: f64,
        color: Color,
    },
    /// Detection caption.
    Label {
        text: String,
        frame: ScreenRect,
        font_size: f64,
        color: Color,
    },
}

impl Layer {
    pub fn box_outline(rect: ScreenRect) -> Self {
        Layer::BoxOutline {
            rect,
            stroke_width: BOX_STROKE_WIDTH,
            color: Color::GREEN,
        }
    }

    /// Caption anchored at the box's top-left, shifted up by 30 points.
    pub fn label(text: String, rect: &ScreenRect) -> Self {
        Layer::Label {
            text,
            frame: ScreenRect::new(
                rect.x,
                rect.y - LABEL_OFFSET_Y,
                LABEL_FRAME_WIDTH,
                LABEL_FRAME_HEIGHT,
            ),
            font_size: LABEL_FONT_SIZE,
            color: Color::WHITE,
        }
    }
}

/// The preview's ordered layer stack. Index 0 always holds [`Layer::Base`].
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLayers {
    layers: Vec<Layer>,
}

impl OverlayLayers {
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::Base],
        }
    }

    /// Drops every layer above the base.
    pub fn clear_overlays(&mut self) {
        self.layers.truncate(1);
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false: the base layer cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layers above the base, in draw order.
    pub fn overlays(&self) -> &[Layer] {
        &self.layers[1..]
    }
}

impl Default for OverlayLayers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stack_holds_only_base() {
        let layers = OverlayLayers::new();
        assert_eq!(layers.layers(), &[Layer::Base]);
        assert!(layers.overlays().is_empty());
    }

    #[test]
    fn test_clear_keeps_base() {
        let mut layers = OverlayLayers::new();
        layers.push(Layer::box_outline(ScreenRect::new(0.0, 0.0, 1.0, 1.0)));
        layers.push(Layer::box_outline(ScreenRect::new(1.0, 1.0, 1.0, 1.0)));
        layers.clear_overlays();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.layers()[0], Layer::Base);
    }

    #[test]
    fn test_label_frame_sits_above_box() {
        let layer = Layer::label("cup 0.50".into(), &ScreenRect::new(10.0, 100.0, 40.0, 40.0));
        match layer {
            Layer::Label {
                frame,
                font_size,
                color,
                ..
            } => {
                assert_eq!(frame, ScreenRect::new(10.0, 70.0, 200.0, 50.0));
                assert_eq!(font_size, 15.0);
                assert_eq!(color, Color::WHITE);
            }
            other => panic!("expected label, got {other:?}"),
        }
    }
}
