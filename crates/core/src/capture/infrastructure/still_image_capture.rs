use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::domain::capture_session::{CaptureError, CaptureReport, CaptureSession};
use crate::shared::frame::Frame;

/// Replays a single image file as a fixed-length camera stream.
///
/// Useful for exercising the live pipeline without a camera attached.
pub struct StillImageCapture {
    path: PathBuf,
    repeat: u64,
}

impl StillImageCapture {
    pub fn new(path: &Path, repeat: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            repeat,
        }
    }
}

impl CaptureSession for StillImageCapture {
    fn start(
        &mut self,
        on_frame: &mut dyn FnMut(Option<Frame>),
        cancelled: &AtomicBool,
    ) -> Result<CaptureReport, CaptureError> {
        let image = image::open(&self.path)
            .map_err(|e| CaptureError::Open {
                source_name: self.describe(),
                message: e.to_string(),
            })?
            .to_rgb8();
        log::info!(
            "Replaying {} ({}x{}) {} times",
            self.path.display(),
            image.width(),
            image.height(),
            self.repeat
        );

        let mut report = CaptureReport::default();
        for index in 0..self.repeat {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let frame = Some(Frame::from_rgb_image(image.clone(), index));
            report.record(&frame);
            on_frame(frame);
        }
        Ok(report)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("still.png");
        image::RgbImage::from_pixel(8, 4, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_repeats_image_with_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = StillImageCapture::new(&write_image(dir.path()), 3);

        let mut seen = Vec::new();
        let report = capture
            .start(&mut |f| seen.push(f.unwrap()), &AtomicBool::new(false))
            .unwrap();

        assert_eq!(report.callbacks, 3);
        assert_eq!(report.missing_buffers, 0);
        let indices: Vec<u64> = seen.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!((seen[0].width(), seen[0].height()), (8, 4));
        assert_eq!(&seen[0].data()[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_cancelled_run_delivers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = StillImageCapture::new(&write_image(dir.path()), 5);
        let mut count = 0;
        let report = capture
            .start(&mut |_| count += 1, &AtomicBool::new(true))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(report.callbacks, 0);
    }

    #[test]
    fn test_unreadable_image_fails_to_open() {
        let mut capture = StillImageCapture::new(Path::new("/nonexistent/still.png"), 1);
        let mut called = false;
        let result = capture.start(&mut |_| called = true, &AtomicBool::new(false));
        assert!(matches!(result, Err(CaptureError::Open { .. })));
        assert!(!called);
    }
}
