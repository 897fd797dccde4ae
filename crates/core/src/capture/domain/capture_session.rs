use std::sync::atomic::AtomicBool;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture source {source_name}: {message}")]
    Open {
        source_name: String,
        message: String,
    },
    #[error("no video stream in capture source {0}")]
    NoVideoStream(String),
}

/// Counts for one capture run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Callbacks issued, with or without a buffer.
    pub callbacks: u64,
    /// Callbacks that carried no pixel buffer.
    pub missing_buffers: u64,
}

impl CaptureReport {
    pub fn record(&mut self, frame: &Option<Frame>) {
        self.callbacks += 1;
        if frame.is_none() {
            self.missing_buffers += 1;
        }
    }
}

/// Domain interface for a source of camera frames.
///
/// `start` opens the source and pushes each captured frame to `on_frame` on
/// the calling thread, in capture order. A callback may carry `None` when
/// the capture produced no usable pixel buffer. The call returns once the
/// source is exhausted, the configured frame limit is hit, or `cancelled`
/// is set. An `Err` means the source could not be opened and no callback
/// was made.
pub trait CaptureSession: Send {
    fn start(
        &mut self,
        on_frame: &mut dyn FnMut(Option<Frame>),
        cancelled: &AtomicBool,
    ) -> Result<CaptureReport, CaptureError>;

    /// Human-readable name of the source, for logs.
    fn describe(&self) -> String;
}
