/// Effective IoU threshold applied before every inference call.
pub const FIXED_IOU_THRESHOLD: f64 = 0.7;

/// Effective confidence threshold applied before every inference call.
pub const FIXED_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Process every Nth camera frame.
pub const DEFAULT_FRAME_INTERVAL: usize = 1;

/// Settings file location under the platform config directory.
pub const APP_DIR_NAME: &str = "camdetect";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
