use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::detection::domain::expression_classifier::DetectionError;
use crate::presentation::emotion_display::{EmotionDisplay, EmotionView};
use crate::presentation::emotion_presenter::{EmotionPresenter, FaceSelection};
use crate::rendering::domain::drawing_surface::DrawingSurface;
use crate::rendering::overlay_renderer::OverlayRenderer;
use crate::shared::constants::DEFAULT_POLL_INTERVAL;

use super::cycle_logger::CycleLogger;
use super::startup_use_case::BoundClassifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug)]
pub struct LoopConfig {
    /// Delay between the end of one cycle and the next detection request.
    pub interval: Duration,
    pub face_selection: FaceSelection,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            face_selection: FaceSelection::default(),
        }
    }
}

/// Everything the loop draws on: the landmark overlay and the emotion
/// text/background.
pub struct Screen {
    surface: Box<dyn DrawingSurface>,
    display: Box<dyn EmotionDisplay>,
}

impl Screen {
    pub fn new(surface: Box<dyn DrawingSurface>, display: Box<dyn EmotionDisplay>) -> Self {
        Self { surface, display }
    }

    fn show_idle(&mut self) {
        self.surface.clear();
        self.display.show(&EmotionView::idle());
    }
}

/// One `start()`..`stop()` span, driven by its own worker thread.
struct Session {
    cancelled: Arc<AtomicBool>,
    // Dropping the sender wakes the worker out of its inter-cycle delay.
    wake: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives the poll → detect → render → present cycle.
///
/// At most one detection request is in flight: each cycle schedules the
/// next only after it has finished, and sessions share the classifier
/// behind a mutex. `stop()` is the only way to end the loop; a failed
/// cycle is logged and the next one is scheduled as usual.
pub struct DetectionLoop {
    classifier: Arc<Mutex<BoundClassifier>>,
    screen: Arc<Mutex<Screen>>,
    logger: Arc<Mutex<Box<dyn CycleLogger>>>,
    config: LoopConfig,
    session: Option<Session>,
    retired: Vec<JoinHandle<()>>,
}

impl DetectionLoop {
    pub fn new(
        classifier: BoundClassifier,
        mut screen: Screen,
        logger: Box<dyn CycleLogger>,
        config: LoopConfig,
    ) -> Self {
        screen.show_idle();
        Self {
            classifier: Arc::new(Mutex::new(classifier)),
            screen: Arc::new(Mutex::new(screen)),
            logger: Arc::new(Mutex::new(logger)),
            config,
            session: None,
            retired: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        if self.session.is_some() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Begins polling immediately. No-op while already running.
    pub fn start(&mut self) {
        if self.session.is_some() {
            log::debug!("Detection already running");
            return;
        }
        self.retired.retain(|handle| !handle.is_finished());

        let cancelled = Arc::new(AtomicBool::new(false));
        let (wake, wake_rx) = crossbeam_channel::bounded::<()>(0);
        let worker = Worker {
            classifier: self.classifier.clone(),
            screen: self.screen.clone(),
            logger: self.logger.clone(),
            cancelled: cancelled.clone(),
            wake: wake_rx,
            interval: self.config.interval,
            renderer: OverlayRenderer::default(),
            presenter: EmotionPresenter::new(self.config.face_selection),
            failures: FailureLog::default(),
        };
        let handle = thread::spawn(move || worker.run());

        {
            let mut logger = lock(&self.logger);
            logger.session_started();
            logger.info("Detection started");
        }
        self.session = Some(Session {
            cancelled,
            wake,
            handle,
        });
    }

    /// Stops polling and resets the overlay and emotion display to idle.
    ///
    /// Takes effect immediately: a detection already in flight finishes
    /// in the background but its result is discarded.
    pub fn stop(&mut self) {
        let session = self.session.take();
        {
            let mut screen = lock(&self.screen);
            if let Some(session) = &session {
                session.cancelled.store(true, Ordering::SeqCst);
            }
            screen.show_idle();
        }

        if let Some(session) = session {
            drop(session.wake);
            self.retired.push(session.handle);
            let mut logger = lock(&self.logger);
            logger.info("Detection stopped");
            logger.summary();
        }
    }

    /// Blocks until the workers of all stopped sessions have exited.
    pub fn join_stopped(&mut self) {
        for handle in self.retired.drain(..) {
            if handle.join().is_err() {
                log::error!("Detection worker panicked");
            }
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.stop();
        }
        self.join_stopped();
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State owned by a session's worker thread.
struct Worker {
    classifier: Arc<Mutex<BoundClassifier>>,
    screen: Arc<Mutex<Screen>>,
    logger: Arc<Mutex<Box<dyn CycleLogger>>>,
    cancelled: Arc<AtomicBool>,
    wake: Receiver<()>,
    interval: Duration,
    renderer: OverlayRenderer,
    presenter: EmotionPresenter,
    failures: FailureLog,
}

impl Worker {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn run(mut self) {
        let mut index: u64 = 0;

        while !self.is_cancelled() {
            index += 1;
            let started = Instant::now();
            let outcome = {
                let mut classifier = lock(&self.classifier);
                // A previous session may have held the classifier until now.
                if self.is_cancelled() {
                    break;
                }
                classifier.detect()
            };
            let detect_ms = elapsed_ms(started);

            let rendered = {
                let mut screen = lock(&self.screen);
                // stop() flips the flag under this same lock, so a late
                // result can never land after the idle reset.
                if self.is_cancelled() {
                    log::debug!("Discarding cycle {index} result after stop");
                    break;
                }
                outcome.map(|result| {
                    let render_started = Instant::now();
                    let Screen { surface, display } = &mut *screen;
                    self.renderer.render(&result, &mut **surface);
                    self.presenter.present(&result, &mut **display);
                    (result.faces.len(), elapsed_ms(render_started))
                })
            };

            {
                let mut logger = lock(&self.logger);
                logger.timing("detect", detect_ms);
                match rendered {
                    Ok((faces, render_ms)) => {
                        self.failures.recovered(index);
                        logger.timing("render", render_ms);
                        logger.metric("faces", faces as f64);
                    }
                    Err(e) => {
                        self.failures.failed(index, &e);
                        logger.failure();
                    }
                }
                logger.cycle(index);
            }

            if self.is_cancelled() {
                break;
            }
            match self.wake.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

/// Collapses a run of identical cycle errors into a single warning.
///
/// A dead camera fails every cycle with the same error; only the first
/// one is worth a `warn!`, the repeats go to `debug!`.
#[derive(Debug, Default)]
struct FailureLog {
    last_error: Option<String>,
    repeats: u64,
}

impl FailureLog {
    /// Logs a failed cycle. Returns whether it was logged as a warning.
    fn failed(&mut self, index: u64, error: &DetectionError) -> bool {
        let message = error.to_string();
        if self.last_error.as_deref() == Some(message.as_str()) {
            self.repeats += 1;
            log::debug!("Detection cycle {index} failed again: {message}");
            return false;
        }
        if self.repeats > 0 {
            log::info!("Previous detection error repeated {} more times", self.repeats);
        }
        log::warn!("Detection cycle {index} failed: {message}");
        self.last_error = Some(message);
        self.repeats = 0;
        true
    }

    fn recovered(&mut self, index: u64) {
        if self.last_error.take().is_some() {
            log::info!(
                "Detection recovered at cycle {index} after {} repeated failures",
                self.repeats
            );
        }
        self.repeats = 0;
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
