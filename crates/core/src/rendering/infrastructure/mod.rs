pub mod rgba_canvas;
