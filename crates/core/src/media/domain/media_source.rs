use thiserror::Error;

use crate::shared::constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
use crate::shared::frame::Frame;

/// Requested capture format. Audio is never captured; the flag exists so
/// sources can reject a request for it explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaConstraints {
    pub width: u32,
    pub height: u32,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            audio: false,
        }
    }
}

/// Format of an acquired stream. Frames from the source have these dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("camera device not found: {0}")]
    NotFound(String),
    #[error("camera access denied: {0}")]
    Denied(String),
    #[error("audio capture is not supported")]
    AudioUnsupported,
    #[error("failed to open stream: {0}")]
    Open(String),
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("media source has not been acquired")]
    NotAcquired,
    #[error("no frame captured yet")]
    NotReady,
    #[error("stream ended")]
    EndOfStream,
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

/// A live frame provider, typically a camera.
///
/// `acquire` must succeed before `current_frame` is called. Sources are
/// read-only from the loop's point of view.
pub trait MediaSource: Send {
    fn acquire(&mut self, constraints: &MediaConstraints) -> Result<StreamInfo, AcquisitionError>;

    /// Latest frame available from the stream.
    fn current_frame(&mut self) -> Result<Frame, FrameError>;
}
