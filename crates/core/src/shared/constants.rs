use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EXPRESSION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EXPRESSION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// Fixed delay between the end of one detection cycle and the next request.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Faces below this detector score are dropped before classification.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.4;

pub const MARKER_RADIUS: f64 = 2.0;
pub const MARKER_STROKE_WIDTH: f64 = 2.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
