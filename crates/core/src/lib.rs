//! Live camera object detection: frame sampling, model inference, and
//! bounding-box overlay rendering.

pub mod capture;
pub mod detection;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod settings;
pub mod shared;
