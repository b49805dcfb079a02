use std::path::Path;

use crate::detection::domain::detection_result::{DetectionResult, FaceDetection};
use crate::detection::domain::expression_classifier::{
    ClassifierLoadError, ClassifierOptions, DetectionError, ExpressionClassifier,
};
use crate::detection::domain::expression_scores::ExpressionScores;
use crate::shared::frame::Frame;

use super::onnx_face_locator::{LocatedFace, OnnxFaceLocator};

/// FER+ input side length (single-channel, raw 0–255 luma).
const FER_INPUT_SIZE: usize = 64;

/// FER+ output classes in model order, renamed to the labels the rest of
/// the crate uses. `contempt` has no presentation entry and falls back.
pub const FER_LABELS: [&str; 8] = [
    "neutral",
    "happy",
    "surprised",
    "sad",
    "angry",
    "disgusted",
    "fearful",
    "contempt",
];

/// Expands face boxes before cropping so the chin and brows are included.
const CROP_MARGIN: f64 = 0.1;

/// Two-stage classifier: YOLO-pose locates faces and keypoints, FER+
/// scores each face crop.
pub struct OnnxExpressionClassifier {
    locator: OnnxFaceLocator,
    expression_session: Option<ort::session::Session>,
    with_landmarks: bool,
}

impl OnnxExpressionClassifier {
    pub fn new(
        face_model: &Path,
        expression_model: &Path,
        options: &ClassifierOptions,
    ) -> Result<Self, ClassifierLoadError> {
        if options.with_descriptors {
            return Err(ClassifierLoadError::Unsupported("face descriptors"));
        }
        let locator = OnnxFaceLocator::new(face_model, options.min_confidence)?;
        let expression_session = if options.with_expressions {
            let session = ort::session::Session::builder()
                .map_err(|e| ClassifierLoadError::Session(e.to_string()))?
                .commit_from_file(expression_model)
                .map_err(|e| ClassifierLoadError::Session(e.to_string()))?;
            Some(session)
        } else {
            None
        };

        Ok(Self {
            locator,
            expression_session,
            with_landmarks: options.with_landmarks,
        })
    }

    fn score_face(
        session: &mut ort::session::Session,
        frame: &Frame,
        face: &LocatedFace,
    ) -> Result<ExpressionScores, DetectionError> {
        let Some(input) = grayscale_crop(frame, &face.bbox) else {
            return Ok(ExpressionScores::new());
        };
        let input_value = ort::value::Tensor::from_array(input)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectionError::Output("expression model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Output(e.to_string()))?;
        let logits: Vec<f32> = tensor.iter().copied().collect();
        if logits.len() != FER_LABELS.len() {
            return Err(DetectionError::Output(format!(
                "expected {} expression logits, got {}",
                FER_LABELS.len(),
                logits.len()
            )));
        }

        Ok(FER_LABELS
            .iter()
            .zip(softmax(&logits))
            .map(|(label, p)| (*label, p as f64))
            .collect())
    }
}

impl ExpressionClassifier for OnnxExpressionClassifier {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DetectionError> {
        let located = self.locator.locate(frame)?;

        let mut faces = Vec::with_capacity(located.len());
        for face in &located {
            let expressions = match self.expression_session.as_mut() {
                Some(session) => Self::score_face(session, frame, face)?,
                None => ExpressionScores::new(),
            };
            let landmarks = if self.with_landmarks {
                face.keypoints.clone()
            } else {
                Vec::new()
            };
            faces.push(FaceDetection::new(landmarks, expressions));
        }
        Ok(DetectionResult::new(faces))
    }
}

/// Crops `bbox` (plus margin) out of the frame and samples it to a
/// `[1, 1, 64, 64]` luma tensor. `None` when the box misses the frame.
fn grayscale_crop(frame: &Frame, bbox: &[f64; 4]) -> Option<ndarray::Array4<f32>> {
    let mx = (bbox[2] - bbox[0]) * CROP_MARGIN;
    let my = (bbox[3] - bbox[1]) * CROP_MARGIN;
    let x1 = (bbox[0] - mx).max(0.0);
    let y1 = (bbox[1] - my).max(0.0);
    let x2 = (bbox[2] + mx).min(frame.width() as f64);
    let y2 = (bbox[3] + my).min(frame.height() as f64);
    if x2 - x1 < 1.0 || y2 - y1 < 1.0 {
        return None;
    }

    let step_x = (x2 - x1) / FER_INPUT_SIZE as f64;
    let step_y = (y2 - y1) / FER_INPUT_SIZE as f64;
    let max_x = frame.width() - 1;
    let max_y = frame.height() - 1;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, FER_INPUT_SIZE, FER_INPUT_SIZE));
    for ty in 0..FER_INPUT_SIZE {
        let sy = ((y1 + (ty as f64 + 0.5) * step_y) as u32).min(max_y);
        for tx in 0..FER_INPUT_SIZE {
            let sx = ((x1 + (tx as f64 + 0.5) * step_x) as u32).min(max_x);
            tensor[[0, 0, ty, tx]] = frame.luma(sx, sy);
        }
    }
    Some(tensor)
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
