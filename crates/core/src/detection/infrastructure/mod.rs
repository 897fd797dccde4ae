pub mod execution_provider;
pub mod labels;
pub mod onnx_yolo_model;
pub mod yolo_decode;
