use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use camdetect_core::capture::infrastructure::source::open_capture;
use camdetect_core::detection::domain::detector::Detector;
use camdetect_core::detection::domain::object_model::ObjectModel;
use camdetect_core::detection::domain::orientation::Orientation;
use camdetect_core::detection::domain::thresholds::{ThresholdConfig, ThresholdSource};
use camdetect_core::detection::infrastructure::execution_provider::ExecutionTarget;
use camdetect_core::detection::infrastructure::labels::LabelSet;
use camdetect_core::detection::infrastructure::onnx_yolo_model::OnnxYoloModel;
use camdetect_core::output::domain::overlay_sink::OverlaySink;
use camdetect_core::output::infrastructure::image_sequence_sink::ImageSequenceSink;
use camdetect_core::output::infrastructure::log_sink::LogSink;
use camdetect_core::overlay::domain::viewport::Viewport;
use camdetect_core::overlay::infrastructure::raster_compositor::RasterCompositor;
use camdetect_core::pipeline::live_pipeline::{LivePipeline, PipelineConfig};
use camdetect_core::pipeline::pipeline_logger::StatsPipelineLogger;
use camdetect_core::settings::Settings;
use camdetect_core::shared::constants::{
    DEFAULT_FRAME_INTERVAL, FIXED_CONFIDENCE_THRESHOLD, FIXED_IOU_THRESHOLD,
};

/// Live object detection on a camera feed with bounding-box overlays.
#[derive(Parser)]
#[command(name = "camdetect")]
struct Cli {
    /// Settings file (default: <config dir>/camdetect/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect objects on a camera, video file, stream URL or still image.
    Run(RunArgs),
    /// Show or change the persisted detection thresholds.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Camera device (/dev/video0), video file, stream URL or image file.
    source: String,

    /// YOLO detection model in ONNX format.
    #[arg(long)]
    model: PathBuf,

    /// Class names, one per line, in model output order (default: COCO-80).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// TTF/OTF font for captions (default: a common system font; captions
    /// are skipped when none is found).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Write annotated frames and prediction records here instead of
    /// logging them.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Preview surface size in points, WIDTHxHEIGHT.
    #[arg(long, default_value = "1080x1920")]
    viewport: Viewport,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL)]
    frame_interval: usize,

    /// Threshold source: fixed values or the persisted settings file.
    #[arg(long, value_enum, default_value_t = ThresholdMode::Fixed)]
    thresholds: ThresholdMode,

    /// IoU threshold for fixed thresholds (0.0-1.0).
    #[arg(long)]
    iou: Option<f64>,

    /// Confidence threshold for fixed thresholds (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Camera buffer orientation relative to upright: up, right, down, left.
    #[arg(long, default_value = "right")]
    orientation: Orientation,

    /// Concurrent inference workers. Workers share one model session, so
    /// extra workers overlap pre- and post-processing, not inference.
    #[arg(long, default_value = "2")]
    workers: usize,

    /// Stop after this many captured frames (still images repeat this often).
    #[arg(long)]
    max_frames: Option<u64>,

    /// ONNX Runtime backend: auto or cpu.
    #[arg(long, default_value = "auto")]
    execution: ExecutionTarget,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThresholdMode {
    Fixed,
    Persisted,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the persisted thresholds.
    Show,
    /// Update the persisted thresholds.
    Set {
        /// IoU threshold (0.0-1.0).
        #[arg(long)]
        iou: Option<f64>,
        /// Confidence threshold (0.0-1.0).
        #[arg(long)]
        confidence: Option<f64>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            validate(&args)?;
            run_live(args, cli.settings)
        }
        Command::Settings { action } => {
            run_settings(action, &resolve_settings_path(cli.settings)?)
        }
    }
}

/// `--settings` if given, else the platform default location.
fn resolve_settings_path(
    explicit: Option<PathBuf>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(Settings::default_path()?),
    }
}

fn run_live(
    args: RunArgs,
    settings_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(&args, settings_path)?;
    if detector.is_degraded() {
        log::warn!("Running without a model; frames are shown without overlays");
    }

    let compositor = match &args.font {
        Some(path) => RasterCompositor::with_font_file(path)?,
        None => RasterCompositor::with_system_font(),
    };
    let sink: Box<dyn OverlaySink> = match &args.output {
        Some(dir) => {
            log::info!("Writing annotated frames to {}", dir.display());
            Box::new(ImageSequenceSink::new(dir)?)
        }
        None => Box::new(LogSink::new()),
    };

    let config = PipelineConfig::new(args.viewport, args.frame_interval, args.workers);
    let mut pipeline = LivePipeline::new(
        Arc::new(detector),
        Box::new(compositor),
        sink,
        Box::new(StatsPipelineLogger::default()),
        config,
    );

    let capture = open_capture(&args.source, args.max_frames);
    let report = pipeline.run(capture);
    if !report.started {
        let reason = report.error.unwrap_or_else(|| "unknown error".into());
        return Err(format!("Pipeline did not start: {reason}").into());
    }

    log::info!(
        "Rendered {} of {} sampled frames",
        report.frames_rendered,
        report.frames_sampled
    );
    Ok(())
}

fn build_detector(
    args: &RunArgs,
    settings_path: Option<PathBuf>,
) -> Result<Detector, Box<dyn std::error::Error>> {
    let labels = match &args.labels {
        Some(path) => LabelSet::from_file(path)
            .map_err(|e| format!("Failed to read labels {}: {e}", path.display()))?,
        None => LabelSet::coco(),
    };

    let thresholds = match args.thresholds {
        ThresholdMode::Fixed => ThresholdSource::Fixed(ThresholdConfig::new(
            args.iou.unwrap_or(FIXED_IOU_THRESHOLD),
            args.confidence.unwrap_or(FIXED_CONFIDENCE_THRESHOLD),
        )),
        ThresholdMode::Persisted => {
            let path = resolve_settings_path(settings_path)?;
            log::info!("Reading thresholds from {}", path.display());
            ThresholdSource::Persisted(path)
        }
    };

    let model = OnnxYoloModel::load(&args.model, labels, args.execution)
        .map(|m| Box::new(m) as Box<dyn ObjectModel>);
    Ok(Detector::from_load_result(model, args.orientation, thresholds))
}

fn run_settings(
    action: SettingsAction,
    settings_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SettingsAction::Show => {
            let settings = Settings::load_or_default(settings_path);
            println!("{}", settings_path.display());
            println!("  iouThreshold:        {}", settings.iou_threshold);
            println!("  confidenceThreshold: {}", settings.confidence_threshold);
        }
        SettingsAction::Set { iou, confidence } => {
            if iou.is_none() && confidence.is_none() {
                return Err("Nothing to set; pass --iou and/or --confidence".into());
            }
            let mut settings = Settings::load_or_default(settings_path);
            if let Some(iou) = iou {
                settings.iou_threshold = iou;
            }
            if let Some(confidence) = confidence {
                settings.confidence_threshold = confidence;
            }
            settings.save_to(settings_path)?;
            log::info!("Saved settings to {}", settings_path.display());
        }
    }
    Ok(())
}

fn validate(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.source.contains("://") && !Path::new(&args.source).exists() {
        return Err(format!("Source not found: {}", args.source).into());
    }
    if args.frame_interval == 0 {
        return Err("Frame interval must be at least 1".into());
    }
    if args.workers == 0 {
        return Err("Workers must be at least 1".into());
    }
    if args.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    if args.thresholds == ThresholdMode::Persisted
        && (args.iou.is_some() || args.confidence.is_some())
    {
        return Err("--iou and --confidence only apply to --thresholds fixed".into());
    }
    for (name, value) in [("IoU", args.iou), ("Confidence", args.confidence)] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {v}").into());
            }
        }
    }
    Ok(())
}
