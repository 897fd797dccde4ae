use std::fmt;
use std::str::FromStr;

use image::imageops;

use crate::shared::frame::Frame;

/// How the sensor buffer relates to the upright scene.
///
/// Named after the side the buffer's first row ends up on, so `Right` means
/// the buffer must be turned 90° clockwise to be upright. A phone camera in
/// portrait delivers `Right` buffers; the model expects upright input, so
/// the hint is required for correct detections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    Up,
    #[default]
    Right,
    Down,
    Left,
}

impl Orientation {
    pub const ALL: &[Orientation] = &[
        Orientation::Up,
        Orientation::Right,
        Orientation::Down,
        Orientation::Left,
    ];

    /// Returns the frame's pixels rotated into upright orientation.
    pub fn upright_image(&self, frame: &Frame) -> image::RgbImage {
        let image = frame.to_rgb_image();
        match self {
            Orientation::Up => image,
            Orientation::Right => imageops::rotate90(&image),
            Orientation::Down => imageops::rotate180(&image),
            Orientation::Left => imageops::rotate270(&image),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Up => "up",
            Orientation::Right => "right",
            Orientation::Down => "down",
            Orientation::Left => "left",
        };
        f.write_str(name)
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Orientation::Up),
            "right" => Ok(Orientation::Right),
            "down" => Ok(Orientation::Down),
            "left" => Ok(Orientation::Left),
            other => Err(format!(
                "orientation must be one of: up, right, down, left, got '{other}'"
            )),
        }
    }
}
