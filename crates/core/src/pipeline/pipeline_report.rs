/// Outcome of one live pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// False when the run could not start, e.g. the capture source failed
    /// to open.
    pub started: bool,
    /// Why the run did not start.
    pub error: Option<String>,
    /// Capture callbacks, including ones without a buffer.
    pub frames_captured: u64,
    pub missing_buffers: u64,
    /// Frames the sampler forwarded to inference.
    pub frames_sampled: u64,
    /// Sampled frames dropped because every inference slot was busy.
    pub frames_dropped_busy: u64,
    pub frames_rendered: u64,
    /// Completions that arrived after a newer frame had been rendered.
    pub stale_dropped: u64,
    pub sink_errors: u64,
}

impl PipelineReport {
    pub fn not_started(error: impl Into<String>) -> Self {
        Self {
            started: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
