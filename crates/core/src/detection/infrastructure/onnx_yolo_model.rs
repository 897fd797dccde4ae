//! YOLO object-detection model running on ONNX Runtime via `ort`.
//!
//! Rotates the frame upright, letterboxes it, runs the session, then decodes
//! and suppresses boxes with the caller's thresholds.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::object_model::{ModelError, ObjectModel, RegionObservation};
use crate::detection::domain::orientation::Orientation;
use crate::detection::domain::thresholds::ThresholdConfig;
use crate::shared::frame::Frame;

use super::execution_provider::ExecutionTarget;
use super::labels::LabelSet;
use super::yolo_decode::{decode, letterbox, nms, to_observations};

/// Fallback input resolution when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// One ort session shared by every caller. `run` needs exclusive access,
/// so concurrent `infer` calls overlap preprocessing and decoding but take
/// turns on the session.
pub struct OnnxYoloModel {
    session: Mutex<ort::session::Session>,
    labels: LabelSet,
    input_size: u32,
}

impl OnnxYoloModel {
    /// Load a YOLO ONNX model. The input resolution is read from the model's
    /// NCHW input shape, falling back to 640.
    pub fn load(
        model_path: &Path,
        labels: LabelSet,
        target: ExecutionTarget,
    ) -> Result<Self, ModelError> {
        let load_err = |e: &dyn std::fmt::Display| ModelError::Load {
            path: model_path.to_path_buf(),
            message: e.to_string(),
        };

        if !model_path.is_file() {
            return Err(load_err(&"file not found"));
        }

        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()
            .map_err(|e| load_err(&e))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| load_err(&e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| load_err(&e))?
            .with_execution_providers(target.providers())
            .map_err(|e| load_err(&e))?
            .commit_from_file(model_path)
            .map_err(|e| load_err(&e))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded detection model {} ({}x{} input, {} labels, {target})",
            model_path.display(),
            input_size,
            input_size,
            labels.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            input_size,
        })
    }
}

impl ObjectModel for OnnxYoloModel {
    fn infer(
        &self,
        frame: &Frame,
        orientation: Orientation,
        thresholds: &ThresholdConfig,
    ) -> Result<Vec<RegionObservation>, ModelError> {
        if frame.is_empty() {
            return Err(ModelError::EmptyFrame);
        }

        let upright = orientation.upright_image(frame);
        let (image_w, image_h) = upright.dimensions();
        let mut lb = letterbox(&upright, self.input_size);

        let input_value = ort::value::Tensor::from_array(std::mem::take(&mut lb.tensor))
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(ModelError::Output("model produced no outputs".into()));
        }

        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ModelError::Output(e.to_string()))?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| ModelError::Output("output tensor is not contiguous".into()))?;

        let detections = decode(
            data,
            &shape,
            &lb,
            image_w,
            image_h,
            thresholds.confidence_threshold,
        )
        .map_err(ModelError::Output)?;
        let kept = nms(detections, thresholds.iou_threshold);

        log::debug!(
            "Frame {}: {} regions after NMS (iou {}, confidence {})",
            frame.index(),
            kept.len(),
            thresholds.iou_threshold,
            thresholds.confidence_threshold
        );

        Ok(to_observations(kept, &self.labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.onnx");
        let err = OnnxYoloModel::load(&path, LabelSet::coco(), ExecutionTarget::Cpu)
            .err()
            .unwrap();
        match err {
            ModelError::Load { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected load error, got {other:?}"),
        }
    }
}
