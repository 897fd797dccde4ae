use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::domain::capture_session::{CaptureError, CaptureReport, CaptureSession};
use crate::detection::domain::detector::Detector;
use crate::detection::domain::frame_sampler::FrameSampler;
use crate::detection::domain::prediction::Prediction;
use crate::output::domain::overlay_sink::{OverlaySink, RenderedFrame};
use crate::overlay::domain::compositor::Compositor;
use crate::overlay::domain::overlay_renderer::OverlayRenderer;
use crate::overlay::domain::viewport::Viewport;
use crate::pipeline::completion_gate::CompletionGate;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::pipeline_report::PipelineReport;
use crate::shared::frame::Frame;

/// Sampled frames that may wait for a free inference worker, per worker.
pub const DEFAULT_PENDING_PER_WORKER: usize = 2;

/// Configuration for a live pipeline run.
pub struct PipelineConfig {
    pub viewport: Viewport,
    pub frame_interval: usize,
    /// Inference worker threads; at least one is always started.
    pub workers: usize,
    /// Sampled frames allowed to wait for a worker before new ones are
    /// dropped. The capture callback never blocks on inference.
    pub max_pending: usize,
    pub cancelled: Arc<AtomicBool>,
}

impl PipelineConfig {
    pub fn new(viewport: Viewport, frame_interval: usize, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            viewport,
            frame_interval,
            workers,
            max_pending: workers * DEFAULT_PENDING_PER_WORKER,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// A sampled frame tagged with its submission id.
struct InferenceJob {
    frame_id: u64,
    frame: Frame,
}

/// An inference result on its way to the UI context.
struct Completion {
    frame_id: u64,
    frame: Frame,
    predictions: Vec<Prediction>,
    inference_ms: f64,
}

/// What the capture thread hands back when the session ends.
struct CaptureOutcome {
    result: Result<CaptureReport, CaptureError>,
    frames_sampled: u64,
    frames_dropped_busy: u64,
}

/// Runs camera capture, sampling, concurrent detection and overlay
/// rendering.
///
/// Layout: `capture thread [sampler] → N inference workers → UI context
/// [gate/render/compose/sink]`. The UI context is the thread that calls
/// [`LivePipeline::run`]; it alone owns the renderer, compositor and sink.
pub struct LivePipeline {
    detector: Arc<Detector>,
    renderer: OverlayRenderer,
    compositor: Box<dyn Compositor>,
    sink: Box<dyn OverlaySink>,
    logger: Box<dyn PipelineLogger>,
    config: PipelineConfig,
}

impl LivePipeline {
    pub fn new(
        detector: Arc<Detector>,
        compositor: Box<dyn Compositor>,
        sink: Box<dyn OverlaySink>,
        logger: Box<dyn PipelineLogger>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            renderer: OverlayRenderer::new(),
            compositor,
            sink,
            logger,
            config,
        }
    }

    /// Runs until the capture session ends or the run is cancelled, then
    /// drains in-flight inferences.
    ///
    /// A capture source that fails to open is logged and reported with
    /// `started == false`; nothing else runs in that case.
    pub fn run(&mut self, capture: Box<dyn CaptureSession>) -> PipelineReport {
        let sampler = match FrameSampler::new(self.config.frame_interval) {
            Ok(sampler) => sampler,
            Err(e) => {
                log::error!("Invalid pipeline configuration: {e}");
                return PipelineReport::not_started(e.to_string());
            }
        };

        let workers = self.config.workers.max(1);
        let (job_tx, job_rx) =
            crossbeam_channel::bounded::<InferenceJob>(self.config.max_pending.max(1));
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Completion>();

        let worker_handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|_| {
                spawn_inference_worker(
                    self.detector.clone(),
                    job_rx.clone(),
                    done_tx.clone(),
                    self.config.cancelled.clone(),
                )
            })
            .collect();
        drop(job_rx);
        drop(done_tx);

        let capture_handle =
            spawn_capture(capture, sampler, job_tx, self.config.cancelled.clone());

        let mut report = PipelineReport {
            started: true,
            ..PipelineReport::default()
        };
        let gate = self.run_ui_loop(done_rx, &mut report);
        report.stale_dropped = gate.stale_dropped();

        for handle in worker_handles {
            if handle.join().is_err() {
                log::error!("Inference worker panicked");
            }
        }

        match capture_handle.join() {
            Ok(outcome) => {
                report.frames_sampled = outcome.frames_sampled;
                report.frames_dropped_busy = outcome.frames_dropped_busy;
                match outcome.result {
                    Ok(capture_report) => {
                        report.frames_captured = capture_report.callbacks;
                        report.missing_buffers = capture_report.missing_buffers;
                    }
                    Err(e) => {
                        log::error!("Failed to start capture session: {e}");
                        report.started = false;
                        report.error = Some(e.to_string());
                    }
                }
            }
            Err(_) => log::error!("Capture thread panicked"),
        }

        self.logger.summary(&report);
        report
    }

    /// Receives completions until every worker has exited, rendering only
    /// those newer than the last rendered frame.
    fn run_ui_loop(
        &mut self,
        done_rx: Receiver<Completion>,
        report: &mut PipelineReport,
    ) -> CompletionGate {
        let mut gate = CompletionGate::new();
        let viewport = self.config.viewport;
        let orientation = self.detector.orientation();

        for completion in done_rx {
            self.logger.timing("inference", completion.inference_ms);
            if !gate.admit(completion.frame_id) {
                log::debug!("Dropping stale completion for frame {}", completion.frame_id);
                continue;
            }

            let t0 = Instant::now();
            let layers = self.renderer.render(&completion.predictions, &viewport);
            let base = orientation.upright_image(&completion.frame);
            let image = self.compositor.compose(&base, layers, &viewport);
            self.logger.timing("compose", t0.elapsed().as_secs_f64() * 1000.0);

            let rendered = RenderedFrame {
                frame_id: completion.frame_id,
                capture_index: completion.frame.index(),
                image: &image,
                predictions: &completion.predictions,
            };
            if let Err(e) = self.sink.write(&rendered) {
                log::warn!("Failed to write frame {}: {e}", completion.frame_id);
                report.sink_errors += 1;
            }

            report.frames_rendered += 1;
            self.logger
                .frame_rendered(completion.frame_id, completion.predictions.len());
        }

        gate
    }
}

fn spawn_capture(
    mut capture: Box<dyn CaptureSession>,
    mut sampler: FrameSampler,
    job_tx: Sender<InferenceJob>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<CaptureOutcome> {
    std::thread::spawn(move || {
        let mut next_id: u64 = 1;
        let mut frames_sampled: u64 = 0;
        let mut frames_dropped_busy: u64 = 0;

        let mut on_frame = |frame: Option<Frame>| {
            let Some(frame) = sampler.sample(frame) else {
                return;
            };
            frames_sampled += 1;
            match job_tx.try_send(InferenceJob {
                frame_id: next_id,
                frame,
            }) {
                Ok(()) => next_id += 1,
                Err(TrySendError::Full(job)) => {
                    log::debug!(
                        "All inference workers busy; dropping frame {}",
                        job.frame.index()
                    );
                    frames_dropped_busy += 1;
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        };

        log::info!("Starting capture from {}", capture.describe());
        let result = capture.start(&mut on_frame, &cancelled);

        CaptureOutcome {
            result,
            frames_sampled,
            frames_dropped_busy,
        }
    })
}

fn spawn_inference_worker(
    detector: Arc<Detector>,
    job_rx: Receiver<InferenceJob>,
    done_tx: Sender<Completion>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            if cancelled.load(Ordering::Relaxed) {
                continue;
            }
            let t0 = Instant::now();
            let predictions = detector.detect(&job.frame);
            let completion = Completion {
                frame_id: job.frame_id,
                frame: job.frame,
                predictions,
                inference_ms: t0.elapsed().as_secs_f64() * 1000.0,
            };
            if done_tx.send(completion).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::detection::domain::object_model::{
        LabelCandidate, ModelError, ObjectModel, RegionObservation,
    };
    use crate::detection::domain::orientation::Orientation;
    use crate::detection::domain::thresholds::{ThresholdConfig, ThresholdSource};
    use crate::output::domain::overlay_sink::SinkError;
    use crate::overlay::domain::layers::OverlayLayers;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::normalized_rect::NormalizedRect;
    use image::RgbImage;

    /// Reports one "person" region per frame, optionally sleeping first.
    struct PersonModel {
        delay_for_index: fn(u64) -> Duration,
    }

    impl ObjectModel for PersonModel {
        fn infer(
            &self,
            frame: &Frame,
            _orientation: Orientation,
            _thresholds: &ThresholdConfig,
        ) -> Result<Vec<RegionObservation>, ModelError> {
            std::thread::sleep((self.delay_for_index)(frame.index()));
            Ok(vec![RegionObservation {
                labels: vec![LabelCandidate {
                    identifier: "person".into(),
                    confidence: 0.91,
                }],
                bounding_box: NormalizedRect::new(0.4, 0.4, 0.2, 0.3),
            }])
        }
    }

    fn no_delay(_: u64) -> Duration {
        Duration::ZERO
    }

    /// Pushes `frames` (or `None` gaps) then ends. `fail` simulates a source
    /// that cannot be opened.
    struct ScriptedCapture {
        frames: Vec<Option<Frame>>,
        gap: Duration,
        fail: bool,
    }

    impl ScriptedCapture {
        fn frames(count: u64) -> Self {
            Self {
                frames: (0..count).map(|i| Some(frame(i))).collect(),
                gap: Duration::ZERO,
                fail: false,
            }
        }
    }

    impl CaptureSession for ScriptedCapture {
        fn start(
            &mut self,
            on_frame: &mut dyn FnMut(Option<Frame>),
            cancelled: &AtomicBool,
        ) -> Result<CaptureReport, CaptureError> {
            if self.fail {
                return Err(CaptureError::Open {
                    source_name: "scripted".into(),
                    message: "device busy".into(),
                });
            }
            let mut report = CaptureReport::default();
            for f in self.frames.drain(..) {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                report.record(&f);
                on_frame(f);
                std::thread::sleep(self.gap);
            }
            Ok(report)
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    /// Records what reached the sink; `fail` makes every write error out.
    struct RecordingSink {
        written: Arc<Mutex<Vec<(u64, usize)>>>,
        fail: bool,
    }

    impl OverlaySink for RecordingSink {
        fn write(&mut self, rendered: &RenderedFrame<'_>) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::CreateDir {
                    path: PathBuf::from("/readonly"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            self.written
                .lock()
                .unwrap()
                .push((rendered.frame_id, rendered.predictions.len()));
            Ok(())
        }
    }

    /// Counts overlay layers per composed frame.
    struct LayerCountingCompositor {
        layer_counts: Arc<Mutex<Vec<usize>>>,
    }

    impl Compositor for LayerCountingCompositor {
        fn compose(
            &mut self,
            base: &RgbImage,
            layers: &OverlayLayers,
            _viewport: &Viewport,
        ) -> RgbImage {
            self.layer_counts.lock().unwrap().push(layers.len());
            base.clone()
        }
    }

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 4 * 2 * 3], 4, 2, index)
    }

    struct Harness {
        written: Arc<Mutex<Vec<(u64, usize)>>>,
        layer_counts: Arc<Mutex<Vec<usize>>>,
        pipeline: LivePipeline,
    }

    fn harness(detector: Detector, config: PipelineConfig, failing_sink: bool) -> Harness {
        let written = Arc::new(Mutex::new(Vec::new()));
        let layer_counts = Arc::new(Mutex::new(Vec::new()));
        let pipeline = LivePipeline::new(
            Arc::new(detector),
            Box::new(LayerCountingCompositor {
                layer_counts: layer_counts.clone(),
            }),
            Box::new(RecordingSink {
                written: written.clone(),
                fail: failing_sink,
            }),
            Box::new(NullPipelineLogger),
            config,
        );
        Harness {
            written,
            layer_counts,
            pipeline,
        }
    }

    fn person_detector(delay_for_index: fn(u64) -> Duration) -> Detector {
        Detector::new(
            Box::new(PersonModel { delay_for_index }),
            Orientation::Right,
            ThresholdSource::default(),
        )
    }

    fn config(frame_interval: usize, workers: usize) -> PipelineConfig {
        let mut config = PipelineConfig::new(Viewport::new(100.0, 200.0), frame_interval, workers);
        config.max_pending = 64;
        config
    }

    #[test]
    fn test_every_frame_rendered_with_single_worker() {
        let mut h = harness(person_detector(no_delay), config(1, 1), false);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(4)));

        assert!(report.started);
        assert_eq!(report.frames_captured, 4);
        assert_eq!(report.frames_sampled, 4);
        assert_eq!(report.frames_rendered, 4);
        assert_eq!(report.stale_dropped, 0);

        let written = h.written.lock().unwrap();
        assert_eq!(*written, vec![(1, 1), (2, 1), (3, 1), (4, 1)]);
        // Base plus box and caption for the single prediction.
        assert!(h.layer_counts.lock().unwrap().iter().all(|&n| n == 3));
    }

    #[test]
    fn test_frame_interval_limits_inference() {
        let mut h = harness(person_detector(no_delay), config(3, 1), false);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(9)));

        assert_eq!(report.frames_captured, 9);
        assert_eq!(report.frames_sampled, 3);
        assert_eq!(report.frames_rendered, 3);
    }

    #[test]
    fn test_missing_buffers_are_skipped() {
        let capture = ScriptedCapture {
            frames: vec![Some(frame(0)), None, Some(frame(2))],
            gap: Duration::ZERO,
            fail: false,
        };
        let mut h = harness(person_detector(no_delay), config(1, 1), false);
        let report = h.pipeline.run(Box::new(capture));

        assert_eq!(report.frames_captured, 3);
        assert_eq!(report.missing_buffers, 1);
        assert_eq!(report.frames_sampled, 2);
        assert_eq!(report.frames_rendered, 2);
    }

    #[test]
    fn test_stale_completion_is_not_rendered() {
        // Frame 0 (id 1) is slow, frame 1 (id 2) is fast, so id 2 completes
        // first and id 1 arrives stale.
        fn slow_first(index: u64) -> Duration {
            if index == 0 {
                Duration::from_millis(300)
            } else {
                Duration::ZERO
            }
        }
        let capture = ScriptedCapture {
            frames: vec![Some(frame(0)), Some(frame(1))],
            gap: Duration::from_millis(20),
            fail: false,
        };
        let mut h = harness(person_detector(slow_first), config(1, 2), false);
        let report = h.pipeline.run(Box::new(capture));

        assert_eq!(report.frames_sampled, 2);
        assert_eq!(report.frames_rendered, 1);
        assert_eq!(report.stale_dropped, 1);
        assert_eq!(*h.written.lock().unwrap(), vec![(2, 1)]);
    }

    #[test]
    fn test_frames_dropped_while_workers_busy_are_counted() {
        fn slow(_: u64) -> Duration {
            Duration::from_millis(100)
        }
        let mut config = config(1, 1);
        config.max_pending = 1;
        let mut h = harness(person_detector(slow), config, false);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(8)));

        assert_eq!(report.frames_sampled, 8);
        assert!(report.frames_dropped_busy > 0);
        assert_eq!(
            report.frames_sampled,
            report.frames_rendered + report.stale_dropped + report.frames_dropped_busy
        );
        // Ids are only consumed by accepted frames, so rendered ids have no gaps.
        let ids: Vec<u64> = h.written.lock().unwrap().iter().map(|&(id, _)| id).collect();
        let expected: Vec<u64> = (1..=report.frames_rendered).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_capture_failure_never_starts() {
        let capture = ScriptedCapture {
            frames: vec![],
            gap: Duration::ZERO,
            fail: true,
        };
        let mut h = harness(person_detector(no_delay), config(1, 2), false);
        let report = h.pipeline.run(Box::new(capture));

        assert!(!report.started);
        assert!(report.error.unwrap().contains("device busy"));
        assert_eq!(report.frames_rendered, 0);
        assert!(h.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_degraded_detector_renders_base_only() {
        let detector = Detector::from_load_result(
            Err(ModelError::Load {
                path: PathBuf::from("/missing.onnx"),
                message: "not found".into(),
            }),
            Orientation::Right,
            ThresholdSource::default(),
        );
        let mut h = harness(detector, config(1, 1), false);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(3)));

        assert_eq!(report.frames_rendered, 3);
        assert!(h.layer_counts.lock().unwrap().iter().all(|&n| n == 1));
        assert!(h.written.lock().unwrap().iter().all(|&(_, n)| n == 0));
    }

    #[test]
    fn test_sink_errors_are_counted_and_run_continues() {
        let mut h = harness(person_detector(no_delay), config(1, 1), true);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(3)));

        assert_eq!(report.frames_rendered, 3);
        assert_eq!(report.sink_errors, 3);
    }

    #[test]
    fn test_cancelled_run_processes_nothing() {
        let config = config(1, 1);
        config.cancelled.store(true, Ordering::Relaxed);
        let mut h = harness(person_detector(no_delay), config, false);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(5)));

        assert!(report.started);
        assert_eq!(report.frames_captured, 0);
        assert_eq!(report.frames_rendered, 0);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut h = harness(person_detector(no_delay), config(0, 1), false);
        let report = h.pipeline.run(Box::new(ScriptedCapture::frames(2)));
        assert!(!report.started);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::new(Viewport::new(10.0, 10.0), 1, 0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.max_pending, DEFAULT_PENDING_PER_WORKER);
        assert!(!config.cancelled.load(Ordering::Relaxed));
    }
}
