use std::collections::HashMap;
use std::time::Instant;

use crate::pipeline::pipeline_report::PipelineReport;

/// Observer for live pipeline events, called from the UI context.
pub trait PipelineLogger: Send {
    /// A completion made it to the screen.
    fn frame_rendered(&mut self, frame_id: u64, detections: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self, _report: &PipelineReport) {}
}

/// Discards all events. Used by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_rendered(&mut self, _frame_id: u64, _detections: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
}

/// Tracks per-stage timings and logs a throttled progress line plus an
/// end-of-run summary through `log`.
pub struct StatsPipelineLogger {
    throttle_frames: u64,
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
    rendered: u64,
    detections: u64,
}

impl StatsPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            start_time: Instant::now(),
            rendered: 0,
            detections: 0,
        }
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn summary_string(&self, report: &PipelineReport) -> String {
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} captured, {} sampled, {} rendered, {:.1}s):",
            report.frames_captured,
            report.frames_sampled,
            report.frames_rendered,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        if self.rendered > 0 {
            lines.push(format!(
                "  detections: avg {:.1} per rendered frame",
                self.detections as f64 / self.rendered as f64
            ));
        }
        if report.stale_dropped > 0 || report.frames_dropped_busy > 0 {
            lines.push(format!(
                "  dropped: {} stale, {} busy",
                report.stale_dropped, report.frames_dropped_busy
            ));
        }
        if report.sink_errors > 0 {
            lines.push(format!("  sink errors: {}", report.sink_errors));
        }
        if self.rendered > 0 && elapsed_ms > 0.0 {
            let fps = self.rendered as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        lines.join("\n")
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn frame_rendered(&mut self, frame_id: u64, detections: usize) {
        self.rendered += 1;
        self.detections += detections as u64;
        if self.rendered % self.throttle_frames == 0 {
            log::info!("Rendered {} frames (latest id {frame_id})", self.rendered);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn summary(&self, report: &PipelineReport) {
        log::info!("\n\n{}", self.summary_string(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_logger_is_noop() {
        let mut logger = NullPipelineLogger;
        logger.frame_rendered(1, 3);
        logger.timing("inference", 5.0);
        logger.summary(&PipelineReport::default());
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.timing("inference", 20.0);
        logger.timing("inference", 30.0);
        logger.timing("compose", 5.0);

        assert_eq!(logger.timings_for("inference").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("compose").unwrap(), &[5.0]);
        assert!(logger.timings_for("sink").is_none());
    }

    #[test]
    fn test_summary_lists_stages_and_drops() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.timing("inference", 10.0);
        logger.frame_rendered(1, 2);
        logger.frame_rendered(2, 0);

        let report = PipelineReport {
            started: true,
            frames_captured: 4,
            frames_sampled: 4,
            frames_rendered: 2,
            stale_dropped: 1,
            ..PipelineReport::default()
        };
        let summary = logger.summary_string(&report);
        assert!(summary.contains("Pipeline summary (4 captured, 4 sampled, 2 rendered"));
        assert!(summary.contains("inference"));
        assert!(summary.contains("avg 1.0 per rendered frame"));
        assert!(summary.contains("1 stale"));
        assert!(!summary.contains("sink errors"));
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StatsPipelineLogger::default().throttle_frames, 30);
    }
}
