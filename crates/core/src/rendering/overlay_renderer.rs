use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::color::Color;
use crate::shared::constants::{MARKER_RADIUS, MARKER_STROKE_WIDTH};

use super::domain::drawing_surface::{DrawingSurface, Stroke};

pub const LANDMARK_STROKE: Stroke = Stroke {
    color: Color::from_hex(0x00FF00),
    width: MARKER_STROKE_WIDTH,
};

/// Draws landmark markers for a whole detection batch.
#[derive(Clone, Copy, Debug)]
pub struct OverlayRenderer {
    radius: f64,
    stroke: Stroke,
}

impl OverlayRenderer {
    pub fn new(radius: f64, stroke: Stroke) -> Self {
        Self { radius, stroke }
    }

    /// Clears the surface once, then marks every landmark of every face.
    ///
    /// Must receive the full result: clearing per face would erase the
    /// markers of faces drawn earlier in the same batch.
    pub fn render(&self, result: &DetectionResult, surface: &mut dyn DrawingSurface) {
        surface.clear();
        for face in &result.faces {
            for &position in &face.landmarks {
                surface.draw_marker(position, self.radius, &self.stroke);
            }
        }
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(MARKER_RADIUS, LANDMARK_STROKE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::domain::detection_result::FaceDetection;
    use crate::detection::domain::expression_scores::ExpressionScores;
    use crate::shared::point::Point;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum DrawOp {
        Clear,
        Marker(Point, f64, Stroke),
    }

    /// Records every call in order.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) ops: Vec<DrawOp>,
    }

    impl DrawingSurface for RecordingSurface {
        fn clear(&mut self) {
            self.ops.push(DrawOp::Clear);
        }

        fn draw_marker(&mut self, center: Point, radius: f64, stroke: &Stroke) {
            self.ops.push(DrawOp::Marker(center, radius, *stroke));
        }
    }

    fn face_with_landmarks(n: usize, offset: f64) -> FaceDetection {
        let landmarks = (0..n)
            .map(|i| Point::new(offset + i as f64, offset))
            .collect();
        FaceDetection::new(landmarks, ExpressionScores::new())
    }

    #[test]
    fn test_batch_of_three_faces_clears_once() {
        let n = 68;
        let result = DetectionResult::new(vec![
            face_with_landmarks(n, 0.0),
            face_with_landmarks(n, 100.0),
            face_with_landmarks(n, 200.0),
        ]);
        let mut surface = RecordingSurface::default();

        OverlayRenderer::default().render(&result, &mut surface);

        assert_eq!(surface.ops.len(), 1 + 3 * n);
        assert_eq!(surface.ops[0], DrawOp::Clear);
        let clears = surface.ops.iter().filter(|op| **op == DrawOp::Clear).count();
        assert_eq!(clears, 1);
    }

    #[test]
    fn test_empty_result_only_clears() {
        let mut surface = RecordingSurface::default();

        OverlayRenderer::default().render(&DetectionResult::empty(), &mut surface);

        assert_eq!(surface.ops, vec![DrawOp::Clear]);
    }

    #[test]
    fn test_markers_use_fixed_radius_and_stroke() {
        let result = DetectionResult::new(vec![face_with_landmarks(1, 5.0)]);
        let mut surface = RecordingSurface::default();

        OverlayRenderer::default().render(&result, &mut surface);

        assert_eq!(
            surface.ops[1],
            DrawOp::Marker(Point::new(5.0, 5.0), 2.0, LANDMARK_STROKE)
        );
        assert_eq!(LANDMARK_STROKE.color.to_string(), "#00FF00");
        assert_eq!(LANDMARK_STROKE.width, 2.0);
    }
}
