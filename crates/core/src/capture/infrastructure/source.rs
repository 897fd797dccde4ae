use std::path::Path;

use crate::capture::domain::capture_session::CaptureSession;
use crate::shared::constants::IMAGE_EXTENSIONS;

use super::ffmpeg_capture::FfmpegCapture;
use super::still_image_capture::StillImageCapture;

/// Frames replayed from a still image when no frame limit is given.
pub const DEFAULT_STILL_REPEAT: u64 = 1;

pub fn is_image_source(source: &str) -> bool {
    Path::new(source)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Picks a capture backend for `source`: still images are replayed
/// `max_frames` times, anything else goes through ffmpeg.
pub fn open_capture(source: &str, max_frames: Option<u64>) -> Box<dyn CaptureSession> {
    if is_image_source(source) {
        Box::new(StillImageCapture::new(
            Path::new(source),
            max_frames.unwrap_or(DEFAULT_STILL_REPEAT),
        ))
    } else {
        Box::new(FfmpegCapture::new(source, max_frames))
    }
}
