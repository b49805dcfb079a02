use crate::shared::point::Point;

use super::expression_scores::ExpressionScores;

/// One detected face: its landmark positions and expression scores.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceDetection {
    pub landmarks: Vec<Point>,
    pub expressions: ExpressionScores,
}

impl FaceDetection {
    pub fn new(landmarks: Vec<Point>, expressions: ExpressionScores) -> Self {
        Self {
            landmarks,
            expressions,
        }
    }
}

/// Output of a single successful classification pass.
///
/// Faces keep the classifier's order, which carries no meaning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub faces: Vec<FaceDetection>,
}

impl DetectionResult {
    pub fn new(faces: Vec<FaceDetection>) -> Self {
        Self { faces }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}
