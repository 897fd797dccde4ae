pub mod ffmpeg_capture;
pub mod source;
pub mod still_image_capture;
