use thiserror::Error;

use crate::media::domain::media_source::FrameError;
use crate::shared::constants::DEFAULT_MIN_CONFIDENCE;
use crate::shared::frame::Frame;

use super::detection_result::DetectionResult;

/// What the classifier is asked to produce for each face.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierOptions {
    pub with_landmarks: bool,
    pub with_expressions: bool,
    pub with_descriptors: bool,
    /// Faces scored below this by the face locator are dropped.
    pub min_confidence: f64,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            with_landmarks: true,
            with_expressions: true,
            with_descriptors: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("no frame available: {0}")]
    Frame(#[from] FrameError),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    Output(String),
}

#[derive(Error, Debug)]
pub enum ClassifierLoadError {
    #[error("model unavailable: {0}")]
    Model(String),
    #[error("unsupported classifier option: {0}")]
    Unsupported(&'static str),
    #[error("failed to initialize inference session: {0}")]
    Session(String),
}

/// Domain interface for per-frame face landmark and expression inference.
///
/// Stateful implementations are allowed, hence `&mut self`. The detection
/// loop never has more than one call in flight.
pub trait ExpressionClassifier: Send {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DetectionError>;
}

/// Builds a ready-to-use classifier from options.
///
/// Loading may be slow (model resolution, session setup); callers treat
/// a successful return as the model's ready signal.
pub trait ClassifierLoader {
    fn load(
        &self,
        options: &ClassifierOptions,
    ) -> Result<Box<dyn ExpressionClassifier>, ClassifierLoadError>;
}
