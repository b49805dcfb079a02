use std::path::PathBuf;

use image::imageops::FilterType;

use crate::media::domain::media_source::{
    AcquisitionError, FrameError, MediaConstraints, MediaSource, StreamInfo,
};
use crate::shared::frame::Frame;

/// Serves one still image as a frozen camera.
///
/// The image is decoded and resized to the constrained size once, at
/// acquisition; every `current_frame` returns a copy with a fresh
/// sequence number.
pub struct StillImageSource {
    path: PathBuf,
    pixels: Option<Vec<u8>>,
    info: Option<StreamInfo>,
    sequence: u64,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pixels: None,
            info: None,
            sequence: 0,
        }
    }
}

impl MediaSource for StillImageSource {
    fn acquire(&mut self, constraints: &MediaConstraints) -> Result<StreamInfo, AcquisitionError> {
        if constraints.audio {
            return Err(AcquisitionError::AudioUnsupported);
        }
        if !self.path.is_file() {
            return Err(AcquisitionError::NotFound(self.path.display().to_string()));
        }

        let decoded = image::open(&self.path)
            .map_err(|e| AcquisitionError::Open(format!("{}: {e}", self.path.display())))?
            .to_rgb8();
        let resized = image::imageops::resize(
            &decoded,
            constraints.width,
            constraints.height,
            FilterType::Triangle,
        );

        let info = StreamInfo {
            width: constraints.width,
            height: constraints.height,
        };
        self.pixels = Some(resized.into_raw());
        self.info = Some(info);
        self.sequence = 0;
        Ok(info)
    }

    fn current_frame(&mut self) -> Result<Frame, FrameError> {
        let (Some(pixels), Some(info)) = (&self.pixels, self.info) else {
            return Err(FrameError::NotAcquired);
        };
        let frame = Frame::new(pixels.clone(), info.width, info.height, self.sequence);
        self.sequence += 1;
        Ok(frame)
    }
}
