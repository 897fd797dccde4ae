use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::domain::capture_session::{CaptureError, CaptureReport, CaptureSession};
use crate::shared::frame::Frame;

/// Device path prefix for Video4Linux2 cameras.
const V4L2_DEVICE_PREFIX: &str = "/dev/video";

/// Captures frames through ffmpeg-next (libavformat + libavdevice).
///
/// Accepts a V4L2 camera device (`/dev/videoN`), a video file or a stream
/// URL. Each decoded picture is converted to RGB24 and pushed as a
/// [`Frame`]; a picture that cannot be converted is pushed as `None`.
pub struct FfmpegCapture {
    source: String,
    max_frames: Option<u64>,
}

impl FfmpegCapture {
    pub fn new(source: impl Into<String>, max_frames: Option<u64>) -> Self {
        Self {
            source: source.into(),
            max_frames,
        }
    }

    fn open_error(&self, e: impl std::fmt::Display) -> CaptureError {
        CaptureError::Open {
            source_name: self.source.clone(),
            message: e.to_string(),
        }
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
        ffmpeg_next::init().map_err(|e| self.open_error(e))?;

        if self.source.starts_with(V4L2_DEVICE_PREFIX) {
            ffmpeg_next::device::register_all();
            let v4l2 = ffmpeg_next::device::input::video()
                .find(|fmt| fmt.name().split(',').any(|n| n == "v4l2"));
            if let Some(fmt) = v4l2 {
                let ctx =
                    ffmpeg_next::format::open_with(&self.source, &fmt, ffmpeg_next::Dictionary::new())
                        .map_err(|e| self.open_error(e))?;
                return Ok(ctx.input());
            }
            log::warn!("ffmpeg was built without v4l2 support; probing {} as a file", self.source);
        }

        ffmpeg_next::format::input(&self.source).map_err(|e| self.open_error(e))
    }

    fn limit_reached(&self, report: &CaptureReport) -> bool {
        self.max_frames.is_some_and(|max| report.callbacks >= max)
    }
}

/// Per-run decoding state.
struct Decoding<'a> {
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    on_frame: &'a mut dyn FnMut(Option<Frame>),
    report: CaptureReport,
}

impl Decoding<'_> {
    /// Pushes every picture the decoder has ready. Returns false once the
    /// callback count hits `max_frames`.
    fn drain(&mut self, max_frames: Option<u64>) -> bool {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            let frame = match self.scaler.run(&decoded, &mut rgb_frame) {
                Ok(()) => {
                    let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
                    Some(Frame::new(pixels, self.width, self.height, self.report.callbacks))
                }
                Err(e) => {
                    log::debug!("Dropping undecodable picture: {e}");
                    None
                }
            };
            self.report.record(&frame);
            (self.on_frame)(frame);

            if max_frames.is_some_and(|max| self.report.callbacks >= max) {
                return false;
            }
        }
        true
    }
}

impl CaptureSession for FfmpegCapture {
    fn start(
        &mut self,
        on_frame: &mut dyn FnMut(Option<Frame>),
        cancelled: &AtomicBool,
    ) -> Result<CaptureReport, CaptureError> {
        let mut ictx = self.open_input()?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NoVideoStream(self.source.clone()))?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| self.open_error(e))?;
        let decoder = codec_ctx.decoder().video().map_err(|e| self.open_error(e))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| self.open_error(e))?;

        log::info!("Capturing from {} ({width}x{height})", self.source);

        let mut decoding = Decoding {
            decoder,
            scaler,
            width,
            height,
            on_frame,
            report: CaptureReport::default(),
        };
        if self.limit_reached(&decoding.report) {
            return Ok(decoding.report);
        }

        let mut stopped = false;
        for (stream, packet) in ictx.packets() {
            if cancelled.load(Ordering::Relaxed) {
                stopped = true;
                break;
            }
            if stream.index() != video_stream_index {
                continue;
            }
            if decoding.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if !decoding.drain(self.max_frames) {
                stopped = true;
                break;
            }
        }

        if !stopped {
            let _ = decoding.decoder.send_eof();
            decoding.drain(self.max_frames);
        }

        log::info!(
            "Capture from {} ended after {} frames",
            self.source,
            decoding.report.callbacks
        );
        Ok(decoding.report)
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}

/// Copies an RGB24 picture into a tightly packed buffer, dropping the
/// per-row stride padding ffmpeg may add.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
