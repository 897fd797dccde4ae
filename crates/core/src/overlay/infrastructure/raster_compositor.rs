use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::overlay::domain::compositor::Compositor;
use crate::overlay::domain::layers::{Color, Layer, OverlayLayers};
use crate::overlay::domain::viewport::{ScreenRect, Viewport};

/// Fonts tried, in order, when no caption font is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("failed to read font {path}: {source}")]
    ReadFont {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not a usable font file")]
    InvalidFont { path: PathBuf },
}

/// Rasterizes an overlay layer stack onto an RGB image.
///
/// The base layer is the upright camera image scaled to fill the viewport
/// and center-cropped. Captions need a font; without one they are skipped
/// and a warning is logged the first time.
pub struct RasterCompositor {
    font: Option<FontArc>,
    warned_missing_font: bool,
}

impl RasterCompositor {
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            font,
            warned_missing_font: false,
        }
    }

    /// Loads a TTF/OTF font from disk for captions.
    pub fn with_font_file(path: &Path) -> Result<Self, CompositorError> {
        let bytes = std::fs::read(path).map_err(|source| CompositorError::ReadFont {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| CompositorError::InvalidFont {
            path: path.to_path_buf(),
        })?;
        Ok(Self::new(Some(font)))
    }

    /// Uses the first loadable system font for captions, or none.
    pub fn with_system_font() -> Self {
        let candidates: Vec<&Path> = SYSTEM_FONT_CANDIDATES.iter().map(|p| Path::new(*p)).collect();
        Self::new(first_loadable_font(&candidates))
    }

    fn draw_label(
        &mut self,
        canvas: &mut RgbImage,
        text: &str,
        frame: &ScreenRect,
        font_size: f64,
        color: Color,
    ) {
        let Some(font) = self.font.as_ref() else {
            if !self.warned_missing_font {
                log::warn!("No font configured; overlay captions will not be drawn");
                self.warned_missing_font = true;
            }
            return;
        };
        draw_text_mut(
            canvas,
            Rgb(color.rgb()),
            frame.x.round() as i32,
            frame.y.round() as i32,
            PxScale::from(font_size as f32),
            font,
            text,
        );
    }
}

impl Compositor for RasterCompositor {
    fn compose(
        &mut self,
        base: &RgbImage,
        layers: &OverlayLayers,
        viewport: &Viewport,
    ) -> RgbImage {
        let (width, height) = viewport.pixel_size();
        let mut canvas = aspect_fill(base, width, height);

        for layer in layers.layers() {
            match layer {
                // Already drawn as the canvas background.
                Layer::Base => {}
                Layer::BoxOutline {
                    rect,
                    stroke_width,
                    color,
                } => draw_stroked_rect(&mut canvas, rect, *stroke_width, *color),
                Layer::Label {
                    text,
                    frame,
                    font_size,
                    color,
                } => self.draw_label(&mut canvas, text, frame, *font_size, *color),
            }
        }

        canvas
    }
}

fn first_loadable_font(candidates: &[&Path]) -> Option<FontArc> {
    candidates.iter().find_map(|path| {
        let bytes = std::fs::read(path).ok()?;
        let font = FontArc::try_from_vec(bytes).ok()?;
        log::info!("Using caption font {}", path.display());
        Some(font)
    })
}

/// Scales `image` to cover `width` x `height`, cropping the overflow evenly.
fn aspect_fill(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return RgbImage::new(width, height);
    }

    let scale = (width as f64 / src_w as f64).max(height as f64 / src_h as f64);
    let scaled_w = ((src_w as f64 * scale).ceil() as u32).max(width);
    let scaled_h = ((src_h as f64 * scale).ceil() as u32).max(height);
    let resized = if (scaled_w, scaled_h) == (src_w, src_h) {
        image.clone()
    } else {
        imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle)
    };

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    imageops::crop_imm(&resized, x, y, width, height).to_image()
}

/// Draws a rectangle border `stroke_width` pixels thick, centered on `rect`'s
/// edges. Pixels outside the canvas are clipped.
fn draw_stroked_rect(canvas: &mut RgbImage, rect: &ScreenRect, stroke_width: f64, color: Color) {
    let x = rect.x.round() as i32;
    let y = rect.y.round() as i32;
    let w = rect.width.round() as i32;
    let h = rect.height.round() as i32;
    let stroke = stroke_width.round().max(1.0) as i32;
    let outer = stroke / 2;

    for inset in -outer..(stroke - outer) {
        let rw = w - 2 * inset;
        let rh = h - 2 * inset;
        if rw <= 0 || rh <= 0 {
            break;
        }
        let r = Rect::at(x + inset, y + inset).of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(canvas, r, Rgb(color.rgb()));
    }
}
