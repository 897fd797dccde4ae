use std::fs;
use std::path::{Path, PathBuf};

use crate::output::domain::overlay_sink::{OverlaySink, PredictionRecord, RenderedFrame, SinkError};

/// Writes each rendered frame as `frame_NNNNNN.png` plus a matching
/// `frame_NNNNNN.json` prediction record.
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl ImageSequenceSink {
    /// Creates the output directory if needed.
    pub fn new(dir: &Path) -> Result<Self, SinkError> {
        fs::create_dir_all(dir).map_err(|source| SinkError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    /// Frames fully written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn stem(frame_id: u64) -> String {
        format!("frame_{frame_id:06}")
    }
}

impl OverlaySink for ImageSequenceSink {
    fn write(&mut self, rendered: &RenderedFrame<'_>) -> Result<(), SinkError> {
        let stem = Self::stem(rendered.frame_id);

        let image_path = self.dir.join(format!("{stem}.png"));
        rendered
            .image
            .save(&image_path)
            .map_err(|source| SinkError::Image {
                path: image_path.clone(),
                source,
            })?;

        let record_path = self.dir.join(format!("{stem}.json"));
        let json = serde_json::to_string_pretty(&PredictionRecord::from(rendered))?;
        fs::write(&record_path, json).map_err(|source| SinkError::Record {
            path: record_path.clone(),
            source,
        })?;

        self.written += 1;
        log::debug!("Wrote {}", image_path.display());
        Ok(())
    }
}
