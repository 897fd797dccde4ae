use crate::output::domain::overlay_sink::{OverlaySink, RenderedFrame, SinkError};

/// Logs each rendered frame's captions instead of storing the image.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl OverlaySink for LogSink {
    fn write(&mut self, rendered: &RenderedFrame<'_>) -> Result<(), SinkError> {
        if rendered.predictions.is_empty() {
            log::info!("Frame {}: no detections", rendered.frame_id);
            return Ok(());
        }
        let captions: Vec<String> = rendered
            .predictions
            .iter()
            .map(|p| p.label_text())
            .collect();
        log::info!("Frame {}: {}", rendered.frame_id, captions.join(", "));
        Ok(())
    }
}
