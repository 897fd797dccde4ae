pub mod detector;
pub mod frame_sampler;
pub mod object_model;
pub mod orientation;
pub mod prediction;
pub mod thresholds;
