use std::sync::{Arc, Mutex, PoisonError};

use crate::shared::color::Color;
use crate::shared::point::Point;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

/// A transparent drawing region laid over the video, in frame-pixel space.
pub trait DrawingSurface: Send {
    /// Erases everything drawn so far.
    fn clear(&mut self);

    /// Strokes a circle outline of `radius` centered on `center`.
    fn draw_marker(&mut self, center: Point, radius: f64, stroke: &Stroke);
}

impl<S: DrawingSurface> DrawingSurface for Arc<Mutex<S>> {
    fn clear(&mut self) {
        self.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn draw_marker(&mut self, center: Point, radius: f64, stroke: &Stroke) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .draw_marker(center, radius, stroke);
    }
}
