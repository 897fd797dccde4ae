use std::path::PathBuf;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

use crate::detection::domain::prediction::Prediction;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write record {path}: {source}")]
    Record {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One composited preview handed to a sink.
pub struct RenderedFrame<'a> {
    /// Pipeline-assigned id, strictly increasing across rendered frames.
    pub frame_id: u64,
    /// Index the capture session gave the underlying frame.
    pub capture_index: u64,
    pub image: &'a RgbImage,
    pub predictions: &'a [Prediction],
}

/// Serialized form of a rendered frame's detections.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord<'a> {
    pub frame_id: u64,
    pub capture_index: u64,
    pub width: u32,
    pub height: u32,
    pub predictions: &'a [Prediction],
}

impl<'a> From<&RenderedFrame<'a>> for PredictionRecord<'a> {
    fn from(rendered: &RenderedFrame<'a>) -> Self {
        Self {
            frame_id: rendered.frame_id,
            capture_index: rendered.capture_index,
            width: rendered.image.width(),
            height: rendered.image.height(),
            predictions: rendered.predictions,
        }
    }
}

/// Destination for composited previews, called from the UI context only.
pub trait OverlaySink {
    fn write(&mut self, rendered: &RenderedFrame<'_>) -> Result<(), SinkError>;
}
