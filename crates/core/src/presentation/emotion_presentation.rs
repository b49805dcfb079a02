//! Static label → (glyph, color) table used to dress up the dominant emotion.

use crate::detection::domain::emotion::Emotion;
use crate::shared::color::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Presentation {
    pub glyph: &'static str,
    pub color: Color,
}

pub const FALLBACK: Presentation = Presentation {
    glyph: "\u{1F914}", // 🤔
    color: Color::WHITE,
};

/// Background shown while no face is visible or the loop is stopped.
pub const IDLE_BACKGROUND: Color = Color::from_hex(0xF0F4F8);

pub fn presentation_for(emotion: Emotion) -> Presentation {
    let (glyph, hex) = match emotion {
        Emotion::Neutral => ("\u{1F610}", 0x808080),   // 😐
        Emotion::Happy => ("\u{1F60A}", 0xFFD700),     // 😊
        Emotion::Sad => ("\u{1F622}", 0x1E90FF),       // 😢
        Emotion::Angry => ("\u{1F620}", 0xFF4500),     // 😠
        Emotion::Fearful => ("\u{1F628}", 0x8A2BE2),   // 😨
        Emotion::Disgusted => ("\u{1F922}", 0x228B22), // 🤢
        Emotion::Surprised => ("\u{1F632}", 0xFF69B4), // 😲
    };
    Presentation {
        glyph,
        color: Color::from_hex(hex),
    }
}

/// Total lookup: labels outside the closed set get [`FALLBACK`].
pub fn lookup(label: &str) -> Presentation {
    Emotion::from_label(label)
        .map(presentation_for)
        .unwrap_or(FALLBACK)
}

/// First character upper-cased, remainder unchanged.
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
