use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::rendering::domain::drawing_surface::{DrawingSurface, Stroke};
use crate::shared::point::Point;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// In-memory RGBA overlay, transparent where nothing has been drawn.
///
/// Pixel (x, y) covers the square [x, x+1) × [y, y+1); coverage is
/// sampled at the pixel center.
pub struct RgbaCanvas {
    image: RgbaImage,
}

impl RgbaCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }

    /// Writes the overlay as a PNG with its alpha channel.
    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
    }
}

impl DrawingSurface for RgbaCanvas {
    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn draw_marker(&mut self, center: Point, radius: f64, stroke: &Stroke) {
        let half = stroke.width / 2.0;
        let reach = radius + half;
        let (w, h) = (self.image.width() as f64, self.image.height() as f64);

        let x0 = (center.x - reach).floor().max(0.0);
        let y0 = (center.y - reach).floor().max(0.0);
        let x1 = (center.x + reach).ceil().min(w);
        let y1 = (center.y + reach).ceil().min(h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let color = Rgba(stroke.color.to_rgba(255));
        for y in y0 as u32..y1 as u32 {
            for x in x0 as u32..x1 as u32 {
                let dx = x as f64 + 0.5 - center.x;
                let dy = y as f64 + 0.5 - center.y;
                let distance = (dx * dx + dy * dy).sqrt();
                if (distance - radius).abs() <= half {
                    self.image.put_pixel(x, y, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::color::Color;

    const GREEN: Stroke = Stroke {
        color: Color::from_hex(0x00FF00),
        width: 2.0,
    };

    #[test]
    fn test_new_canvas_is_transparent() {
        let canvas = RgbaCanvas::new(64, 48);
        assert_eq!((canvas.width(), canvas.height()), (64, 48));
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_marker_is_a_hollow_ring() {
        let mut canvas = RgbaCanvas::new(32, 32);

        canvas.draw_marker(Point::new(10.5, 10.5), 2.0, &GREEN);

        // On the ring: two pixels right of center.
        assert_eq!(canvas.image().get_pixel(12, 10), &Rgba([0, 255, 0, 255]));
        // Center stays transparent.
        assert_eq!(canvas.image().get_pixel(10, 10)[3], 0);
        // Well outside the ring.
        assert_eq!(canvas.image().get_pixel(20, 20)[3], 0);
    }

    #[test]
    fn test_clear_erases_markers() {
        let mut canvas = RgbaCanvas::new(32, 32);
        canvas.draw_marker(Point::new(16.0, 16.0), 2.0, &GREEN);
        assert!(!canvas.is_blank());

        canvas.clear();

        assert!(canvas.is_blank());
    }

    #[test]
    fn test_marker_outside_canvas_is_clipped() {
        let mut canvas = RgbaCanvas::new(8, 8);

        canvas.draw_marker(Point::new(-50.0, 100.0), 2.0, &GREEN);
        canvas.draw_marker(Point::new(0.0, 0.0), 2.0, &GREEN);

        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_save_png_round_trips_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("overlay.png");
        let mut canvas = RgbaCanvas::new(40, 30);
        canvas.draw_marker(Point::new(20.0, 15.0), 2.0, &GREEN);

        canvas.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (40, 30));
        assert_eq!(loaded, *canvas.image());
    }
}
