pub mod completion_gate;
pub mod live_pipeline;
pub mod pipeline_logger;
pub mod pipeline_report;
