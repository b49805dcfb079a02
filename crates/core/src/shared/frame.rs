use ndarray::ArrayView3;

/// One captured camera frame: contiguous RGB bytes in row-major order.
///
/// Pixel format conversion happens inside media sources; everything past
/// that boundary treats the data as opaque RGB24.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Monotonic capture counter assigned by the media source.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, Self::CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Rec. 601 luma of the pixel at (`x`, `y`).
    pub fn luma(&self, x: u32, y: u32) -> f32 {
        let i = ((y as usize) * (self.width as usize) + x as usize) * Self::CHANNELS;
        let (r, g, b) = (self.data[i], self.data[i + 1], self.data[i + 2]);
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 7);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_luma_of_white_and_black() {
        let mut data = vec![0u8; 6]; // 2x1
        data[3..6].copy_from_slice(&[255, 255, 255]);
        let frame = Frame::new(data, 2, 1, 0);
        assert!(frame.luma(0, 0).abs() < 1e-3);
        assert!((frame.luma(1, 0) - 255.0).abs() < 1e-2);
    }
}
