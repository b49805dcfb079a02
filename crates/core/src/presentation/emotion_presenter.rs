use crate::detection::domain::detection_result::{DetectionResult, FaceDetection};

use super::emotion_display::{EmotionDisplay, EmotionView};
use super::emotion_presentation::{capitalize, lookup};

/// Which face drives the display when several are detected in one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaceSelection {
    /// Every face updates the display in turn; the last one processed stays visible.
    #[default]
    LastFace,
    /// Only the face whose dominant emotion has the highest score is shown.
    MostConfident,
}

/// Maps a detection result to label, confidence and background updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmotionPresenter {
    selection: FaceSelection,
}

impl EmotionPresenter {
    pub fn new(selection: FaceSelection) -> Self {
        Self { selection }
    }

    pub fn present(&self, result: &DetectionResult, display: &mut dyn EmotionDisplay) {
        if result.is_empty() {
            display.show(&EmotionView::idle());
            return;
        }

        match self.selection {
            FaceSelection::LastFace => {
                for face in &result.faces {
                    display.show(&view_for(face));
                }
            }
            FaceSelection::MostConfident => {
                let best = result
                    .faces
                    .iter()
                    .map(|face| (face, dominant_score(face)))
                    .fold(None, |best: Option<(&FaceDetection, f64)>, (face, score)| {
                        match best {
                            Some((_, best_score)) if score <= best_score => best,
                            _ => Some((face, score)),
                        }
                    });
                if let Some((face, _)) = best {
                    display.show(&view_for(face));
                }
            }
        }
    }
}

fn dominant_score(face: &FaceDetection) -> f64 {
    face.expressions
        .dominant()
        .map(|(_, score)| score)
        .unwrap_or(0.0)
}

/// View for one face. A face without any expression scores is shown with
/// the fallback glyph and an unknown label.
pub fn view_for(face: &FaceDetection) -> EmotionView {
    let (label, score) = face.expressions.dominant().unwrap_or(("unknown", 0.0));
    let presentation = lookup(label);
    EmotionView {
        label: format!("{} {}", presentation.glyph, capitalize(label)),
        confidence: format_confidence(score),
        background: presentation.color,
    }
}

pub fn format_confidence(score: f64) -> String {
    format!("Confidence: {:.2}%", score * 100.0)
}
