use std::path::PathBuf;

use crate::detection::domain::expression_classifier::{
    ClassifierLoadError, ClassifierLoader, ClassifierOptions, ExpressionClassifier,
};
use crate::shared::constants::{
    EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, FACE_MODEL_NAME, FACE_MODEL_URL,
};
use crate::shared::model_resolver::{self, ModelSpec, ProgressFn};

use super::onnx_expression_classifier::OnnxExpressionClassifier;

pub const FACE_MODEL: ModelSpec = ModelSpec {
    name: FACE_MODEL_NAME,
    url: FACE_MODEL_URL,
};

pub const EXPRESSION_MODEL: ModelSpec = ModelSpec {
    name: EXPRESSION_MODEL_NAME,
    url: EXPRESSION_MODEL_URL,
};

/// Resolves both ONNX models (cache, bundled dir, download) and builds an
/// [`OnnxExpressionClassifier`].
pub struct OnnxClassifierLoader {
    bundled_dir: Option<PathBuf>,
    progress: Option<fn(u64, u64)>,
}

impl OnnxClassifierLoader {
    pub fn new(bundled_dir: Option<PathBuf>) -> Self {
        Self {
            bundled_dir,
            progress: None,
        }
    }

    /// Reports `(downloaded, total)` bytes while a model downloads.
    pub fn with_progress(mut self, progress: fn(u64, u64)) -> Self {
        self.progress = Some(progress);
        self
    }

    fn resolve(&self, spec: ModelSpec) -> Result<PathBuf, ClassifierLoadError> {
        let progress = self.progress.map(|f| -> ProgressFn { Box::new(f) });
        model_resolver::resolve(spec, self.bundled_dir.as_deref(), progress)
            .map_err(|e| ClassifierLoadError::Model(format!("{}: {e}", spec.name)))
    }
}

impl ClassifierLoader for OnnxClassifierLoader {
    fn load(
        &self,
        options: &ClassifierOptions,
    ) -> Result<Box<dyn ExpressionClassifier>, ClassifierLoadError> {
        let face_model = self.resolve(FACE_MODEL)?;
        let expression_model = self.resolve(EXPRESSION_MODEL)?;
        log::debug!(
            "Loading classifier from {} and {}",
            face_model.display(),
            expression_model.display()
        );
        Ok(Box::new(OnnxExpressionClassifier::new(
            &face_model,
            &expression_model,
            options,
        )?))
    }
}
