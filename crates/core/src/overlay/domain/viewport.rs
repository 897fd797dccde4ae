use std::fmt;
use std::str::FromStr;

use crate::shared::normalized_rect::NormalizedRect;

/// Largest accepted viewport side, in points.
pub const MAX_VIEWPORT_DIMENSION: f64 = 16384.0;

/// Size of the preview surface in screen points. Origin is top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions of a raster surface for this viewport.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `1080x1920`.
impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("viewport must look like WIDTHxHEIGHT, got '{s}'"))?;
        let width: f64 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid viewport width '{w}'"))?;
        let height: f64 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid viewport height '{h}'"))?;
        for side in [width, height] {
            if !side.is_finite() || side <= 0.0 || side > MAX_VIEWPORT_DIMENSION {
                return Err(format!(
                    "viewport sides must be between 0 and {MAX_VIEWPORT_DIMENSION}, got '{s}'"
                ));
            }
        }
        Ok(Self { width, height })
    }
}

/// Axis-aligned rectangle in screen points, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Maps a bottom-left-origin normalized box to top-left screen space.
pub fn to_screen_rect(bbox: &NormalizedRect, viewport: &Viewport) -> ScreenRect {
    let w = viewport.width;
    let h = viewport.height;
    ScreenRect {
        x: bbox.x * w,
        y: (1.0 - bbox.y) * h - bbox.height * h,
        width: bbox.width * w,
        height: bbox.height * h,
    }
}

/// Inverse of [`to_screen_rect`].
pub fn to_normalized_rect(rect: &ScreenRect, viewport: &Viewport) -> NormalizedRect {
    let w = viewport.width;
    let h = viewport.height;
    NormalizedRect {
        x: rect.x / w,
        y: 1.0 - (rect.y + rect.height) / h,
        width: rect.width / w,
        height: rect.height / h,
    }
}
