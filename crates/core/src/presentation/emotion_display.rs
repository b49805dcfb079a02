use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::shared::color::Color;

use super::emotion_presentation::IDLE_BACKGROUND;

pub const LABEL_PLACEHOLDER: &str = "--";
pub const CONFIDENCE_PLACEHOLDER: &str = "Confidence: --";

/// The three pieces of observable UI state the presenter writes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmotionView {
    pub label: String,
    pub confidence: String,
    pub background: Color,
}

impl EmotionView {
    pub fn idle() -> Self {
        Self {
            label: LABEL_PLACEHOLDER.to_string(),
            confidence: CONFIDENCE_PLACEHOLDER.to_string(),
            background: IDLE_BACKGROUND,
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }
}

impl Default for EmotionView {
    fn default() -> Self {
        Self::idle()
    }
}

/// Sink for emotion text and ambient color.
pub trait EmotionDisplay: Send {
    fn show(&mut self, view: &EmotionView);
}

/// Lets a caller keep a handle on a display it has handed to the loop.
impl<D: EmotionDisplay> EmotionDisplay for Arc<Mutex<D>> {
    fn show(&mut self, view: &EmotionView) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .show(view);
    }
}

/// Keeps the most recent view in memory.
#[derive(Debug, Default)]
pub struct DisplayState {
    current: EmotionView,
    updates: usize,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &EmotionView {
        &self.current
    }

    /// Number of `show` calls received, including repeats.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl EmotionDisplay for DisplayState {
    fn show(&mut self, view: &EmotionView) {
        self.current = view.clone();
        self.updates += 1;
    }
}

/// Logs a line whenever the displayed label changes.
pub struct LoggingDisplay<D> {
    inner: D,
    last_label: Option<String>,
}

impl<D: EmotionDisplay> LoggingDisplay<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            last_label: None,
        }
    }
}

impl<D: EmotionDisplay> EmotionDisplay for LoggingDisplay<D> {
    fn show(&mut self, view: &EmotionView) {
        if self.last_label.as_deref() != Some(view.label.as_str()) {
            log::info!("{}  {}  [{}]", view.label, view.confidence, view.background);
            self.last_label = Some(view.label.clone());
        }
        self.inner.show(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn happy_view() -> EmotionView {
        EmotionView {
            label: "\u{1F60A} Happy".to_string(),
            confidence: "Confidence: 70.00%".to_string(),
            background: Color::from_hex(0xFFD700),
        }
    }

    #[test]
    fn test_idle_view_values() {
        let view = EmotionView::idle();
        assert_eq!(view.label, "--");
        assert_eq!(view.confidence, "Confidence: --");
        assert_eq!(view.background.to_string(), "#F0F4F8");
        assert!(view.is_idle());
    }

    #[test]
    fn test_display_state_starts_idle() {
        let state = DisplayState::new();
        assert!(state.current().is_idle());
        assert_eq!(state.updates(), 0);
    }

    #[test]
    fn test_display_state_keeps_latest() {
        let mut state = DisplayState::new();
        state.show(&happy_view());
        state.show(&EmotionView::idle());
        assert!(state.current().is_idle());
        assert_eq!(state.updates(), 2);
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let shared = Arc::new(Mutex::new(DisplayState::new()));
        let mut handle = shared.clone();
        handle.show(&happy_view());
        assert_eq!(shared.lock().unwrap().current(), &happy_view());
    }

    #[test]
    fn test_logging_display_forwards_every_update() {
        let shared = Arc::new(Mutex::new(DisplayState::new()));
        let mut display = LoggingDisplay::new(shared.clone());
        display.show(&happy_view());
        display.show(&happy_view());
        assert_eq!(shared.lock().unwrap().updates(), 2);
    }

    #[test]
    fn test_view_serializes_background_as_hex() {
        let json = serde_json::to_value(happy_view()).unwrap();
        assert_eq!(json["background"], "#FFD700");
        assert_eq!(json["confidence"], "Confidence: 70.00%");
    }
}
