pub mod image_sequence_sink;
pub mod log_sink;
