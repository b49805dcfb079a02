use thiserror::Error;

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::expression_classifier::{
    ClassifierLoadError, ClassifierLoader, ClassifierOptions, DetectionError, ExpressionClassifier,
};
use crate::media::domain::media_source::{
    AcquisitionError, MediaConstraints, MediaSource, StreamInfo,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("error accessing camera: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("error loading expression model: {0}")]
    ClassifierLoad(#[from] ClassifierLoadError),
}

/// A classifier paired with the media source it reads frames from.
pub struct BoundClassifier {
    source: Box<dyn MediaSource>,
    classifier: Box<dyn ExpressionClassifier>,
}

impl BoundClassifier {
    pub fn new(source: Box<dyn MediaSource>, classifier: Box<dyn ExpressionClassifier>) -> Self {
        Self { source, classifier }
    }

    /// One classification pass over the source's current frame.
    pub fn detect(&mut self) -> Result<DetectionResult, DetectionError> {
        let frame = self.source.current_frame()?;
        self.classifier.detect(&frame)
    }
}

pub struct Startup {
    pub classifier: BoundClassifier,
    pub stream: StreamInfo,
}

/// Acquire the camera, then load the classifier against it.
///
/// Acquisition failure aborts before any model is loaded; there is no
/// partially started state.
pub struct StartupUseCase<'a> {
    source: Box<dyn MediaSource>,
    loader: &'a dyn ClassifierLoader,
    on_ready: Option<Box<dyn FnOnce(&StreamInfo) + 'a>>,
}

impl<'a> StartupUseCase<'a> {
    pub fn new(
        source: Box<dyn MediaSource>,
        loader: &'a dyn ClassifierLoader,
        on_ready: Option<Box<dyn FnOnce(&StreamInfo) + 'a>>,
    ) -> Self {
        Self {
            source,
            loader,
            on_ready,
        }
    }

    pub fn execute(
        mut self,
        constraints: &MediaConstraints,
        options: &ClassifierOptions,
    ) -> Result<Startup, StartupError> {
        let stream = self.source.acquire(constraints)?;
        let classifier = self.loader.load(options)?;

        match self.on_ready.take() {
            Some(on_ready) => on_ready(&stream),
            None => log::info!("Expression model loaded"),
        }

        Ok(Startup {
            classifier: BoundClassifier::new(self.source, classifier),
            stream,
        })
    }
}
