use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::media::domain::media_source::{
    AcquisitionError, FrameError, MediaConstraints, MediaSource, StreamInfo,
};
use crate::shared::frame::Frame;

/// How long `current_frame` waits for the very first decoded frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

const EACCES: i32 = 13;

/// Captures from a camera device (e.g. `/dev/video0`) or a video file via
/// ffmpeg-next.
///
/// A background thread decodes continuously and keeps only the newest
/// frame, scaled to the constrained size, so `current_frame` always sees
/// the live picture instead of a backlog. Files are paced at their frame
/// rate and loop back to the start.
pub struct FfmpegCameraSource {
    location: PathBuf,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    capture: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
}

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    failure: Option<String>,
    ended: bool,
}

impl Slot {
    fn settled(&self) -> bool {
        self.frame.is_some() || self.failure.is_some() || self.ended
    }
}

impl FfmpegCameraSource {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            shared: Arc::new(Shared::default()),
            stop: Arc::new(AtomicBool::new(false)),
            capture: None,
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.capture.take() {
            let _ = handle.join();
        }
    }
}

impl MediaSource for FfmpegCameraSource {
    fn acquire(&mut self, constraints: &MediaConstraints) -> Result<StreamInfo, AcquisitionError> {
        if constraints.audio {
            return Err(AcquisitionError::AudioUnsupported);
        }
        if !self.location.exists() {
            return Err(AcquisitionError::NotFound(self.location.display().to_string()));
        }
        self.shutdown();

        let stream = CaptureStream::open(&self.location, constraints)?;
        log::info!(
            "Acquired {} ({}x{} -> {}x{})",
            self.location.display(),
            stream.source_width,
            stream.source_height,
            constraints.width,
            constraints.height
        );

        self.stop = Arc::new(AtomicBool::new(false));
        self.shared = Arc::new(Shared::default());
        let shared = self.shared.clone();
        let stop = self.stop.clone();
        self.capture = Some(thread::spawn(move || stream.run(&shared, &stop)));

        Ok(StreamInfo {
            width: constraints.width,
            height: constraints.height,
        })
    }

    fn current_frame(&mut self) -> Result<Frame, FrameError> {
        if self.capture.is_none() {
            return Err(FrameError::NotAcquired);
        }

        let guard = self
            .shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (slot, _) = self
            .shared
            .ready
            .wait_timeout_while(guard, FIRST_FRAME_TIMEOUT, |slot| !slot.settled())
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(message) = &slot.failure {
            return Err(FrameError::Decode(message.clone()));
        }
        if slot.ended {
            return Err(FrameError::EndOfStream);
        }
        slot.frame.clone().ok_or(FrameError::NotReady)
    }
}

impl Drop for FfmpegCameraSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Demuxer, decoder and scaler for one opened input.
struct CaptureStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    source_width: u32,
    source_height: u32,
    width: u32,
    height: u32,
    /// `None` for live devices, which block on read instead.
    frame_interval: Option<Duration>,
}

// Safety: a CaptureStream is moved into its capture thread once and only
// ever touched from there. The raw ffmpeg pointers are never shared.
unsafe impl Send for CaptureStream {}

impl CaptureStream {
    fn open(location: &Path, constraints: &MediaConstraints) -> Result<Self, AcquisitionError> {
        ffmpeg_next::init().map_err(|e| AcquisitionError::Open(e.to_string()))?;
        ffmpeg_next::device::register_all();

        // Only device demuxers read this; file demuxers leave it unused.
        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", constraints.width, constraints.height),
        );

        let ictx = ffmpeg_next::format::input_with_dictionary(location, options).map_err(
            |e| match e {
                ffmpeg_next::Error::Other { errno } if errno == EACCES => {
                    AcquisitionError::Denied(location.display().to_string())
                }
                other => AcquisitionError::Open(other.to_string()),
            },
        )?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| AcquisitionError::Open("no video stream found".to_string()))?;
        let stream_index = stream.index();

        let rate = stream.avg_frame_rate();
        let live = !location.is_file();
        let frame_interval = (!live && rate.numerator() > 0 && rate.denominator() > 0)
            .then(|| Duration::from_secs_f64(rate.denominator() as f64 / rate.numerator() as f64));

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| AcquisitionError::Open(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| AcquisitionError::Open(e.to_string()))?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            constraints.width,
            constraints.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| AcquisitionError::Open(e.to_string()))?;

        Ok(Self {
            source_width: decoder.width(),
            source_height: decoder.height(),
            ictx,
            decoder,
            scaler,
            stream_index,
            width: constraints.width,
            height: constraints.height,
            frame_interval,
        })
    }

    fn run(mut self, shared: &Shared, stop: &AtomicBool) {
        let mut sequence = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let outcome = self.next_frame(sequence);
            let mut slot = shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match outcome {
                Ok(Some(frame)) => {
                    slot.frame = Some(frame);
                    sequence += 1;
                }
                Ok(None) => {
                    slot.ended = true;
                    shared.ready.notify_all();
                    log::warn!("Capture stream ended");
                    return;
                }
                Err(e) => {
                    slot.failure = Some(e.to_string());
                    shared.ready.notify_all();
                    log::error!("Capture failed: {e}");
                    return;
                }
            }
            drop(slot);
            shared.ready.notify_all();

            if let Some(interval) = self.frame_interval {
                thread::sleep(interval);
            }
        }
    }

    /// Decodes the next frame. Files rewind at end of stream; live
    /// devices report `None`.
    fn next_frame(&mut self, sequence: u64) -> Result<Option<Frame>, ffmpeg_next::Error> {
        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
                self.scaler.run(&decoded, &mut rgb)?;
                let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
                return Ok(Some(Frame::new(pixels, self.width, self.height, sequence)));
            }

            let next = self
                .ictx
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match next {
                Some((index, packet)) if index == self.stream_index => {
                    // Corrupt packets are skipped; the next one may decode.
                    let _ = self.decoder.send_packet(&packet);
                }
                Some(_) => {}
                None if self.frame_interval.is_some() => {
                    self.ictx.seek(0, ..)?;
                    self.decoder.flush();
                }
                None => return Ok(None),
            }
        }
    }
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * Frame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
