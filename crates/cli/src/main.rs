use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use emotion_mirror_core::detection::domain::expression_classifier::ClassifierOptions;
use emotion_mirror_core::detection::infrastructure::onnx_classifier_loader::OnnxClassifierLoader;
use emotion_mirror_core::media::domain::media_source::{
    MediaConstraints, MediaSource, StreamInfo,
};
use emotion_mirror_core::media::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use emotion_mirror_core::media::infrastructure::still_image_source::StillImageSource;
use emotion_mirror_core::pipeline::cycle_logger::StatsCycleLogger;
use emotion_mirror_core::pipeline::detection_loop::{DetectionLoop, LoopConfig, LoopState, Screen};
use emotion_mirror_core::pipeline::startup_use_case::StartupUseCase;
use emotion_mirror_core::presentation::emotion_display::{DisplayState, LoggingDisplay};
use emotion_mirror_core::presentation::emotion_presenter::FaceSelection;
use emotion_mirror_core::rendering::infrastructure::rgba_canvas::RgbaCanvas;
use emotion_mirror_core::shared::constants::{
    DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, IMAGE_EXTENSIONS,
};

/// Live facial emotion mirror driven from the terminal.
#[derive(Parser)]
#[command(name = "emotion-mirror")]
struct Cli {
    /// Capture device or video file to read frames from.
    #[arg(default_value = "/dev/video0")]
    device: PathBuf,

    /// Use a still image as a frozen camera instead of a device.
    #[arg(long)]
    still: Option<PathBuf>,

    /// Requested frame width in pixels.
    #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
    width: u32,

    /// Requested frame height in pixels.
    #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
    height: u32,

    /// Delay between detection cycles in milliseconds.
    #[arg(long, default_value = "200")]
    interval_ms: u64,

    /// Minimum face confidence (0.0-1.0).
    #[arg(long, default_value = "0.4")]
    min_confidence: f64,

    /// Which face drives the display when several are found.
    #[arg(long, value_enum, default_value = "last")]
    face_selection: FaceSelectionArg,

    /// Directory searched for bundled models before downloading.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Log a progress line every N detection cycles.
    #[arg(long, default_value = "50")]
    log_every: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum FaceSelectionArg {
    Last,
    MostConfident,
}

impl From<FaceSelectionArg> for FaceSelection {
    fn from(arg: FaceSelectionArg) -> Self {
        match arg {
            FaceSelectionArg::Last => FaceSelection::LastFace,
            FaceSelectionArg::MostConfident => FaceSelection::MostConfident,
        }
    }
}

enum Command {
    Start,
    Stop,
    Status,
    Snapshot(PathBuf),
    Help,
    Quit,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let constraints = MediaConstraints {
        width: cli.width,
        height: cli.height,
        audio: false,
    };
    let options = ClassifierOptions {
        min_confidence: cli.min_confidence,
        ..ClassifierOptions::default()
    };
    let loader = OnnxClassifierLoader::new(cli.models_dir.clone()).with_progress(download_progress);

    let on_ready: Box<dyn FnOnce(&StreamInfo)> = Box::new(|stream: &StreamInfo| {
        eprintln!();
        log::info!(
            "Expression model loaded, streaming {}x{}",
            stream.width,
            stream.height
        );
    });
    let startup = StartupUseCase::new(open_source(&cli), &loader, Some(on_ready))
        .execute(&constraints, &options)?;

    let canvas = Arc::new(Mutex::new(RgbaCanvas::new(
        startup.stream.width,
        startup.stream.height,
    )));
    let display = Arc::new(Mutex::new(DisplayState::new()));
    let screen = Screen::new(
        Box::new(canvas.clone()),
        Box::new(LoggingDisplay::new(display.clone())),
    );
    let config = LoopConfig {
        interval: Duration::from_millis(cli.interval_ms),
        face_selection: cli.face_selection.into(),
    };
    let mut detection = DetectionLoop::new(
        startup.classifier,
        screen,
        Box::new(StatsCycleLogger::new(cli.log_every)),
        config,
    );

    print_help();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        match command {
            Command::Start => detection.start(),
            Command::Stop => detection.stop(),
            Command::Status => {
                let view = display
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .current()
                    .clone();
                let running = detection.state() == LoopState::Running;
                let status = serde_json::json!({ "running": running, "display": view });
                println!("{status}");
            }
            Command::Snapshot(path) => {
                let result = canvas
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .save_png(&path);
                match result {
                    Ok(()) => log::info!("Overlay written to {}", path.display()),
                    Err(e) => eprintln!("Could not write {}: {e}", path.display()),
                }
            }
            Command::Help => print_help(),
            Command::Quit => break,
        }
        io::stdout().flush()?;
    }

    detection.stop();
    detection.join_stopped();
    Ok(())
}

fn open_source(cli: &Cli) -> Box<dyn MediaSource> {
    match &cli.still {
        Some(path) => Box::new(StillImageSource::new(path)),
        None => Box::new(FfmpegCameraSource::new(&cli.device)),
    }
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let command = match name {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "snapshot" => match words.next() {
            Some(path) => Command::Snapshot(PathBuf::from(path)),
            None => return Err("usage: snapshot <path.png>".to_string()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

fn print_help() {
    eprintln!("Commands: start, stop, status, snapshot <path.png>, help, quit");
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(still) = &cli.still {
        if !still.exists() {
            return Err(format!("Image file not found: {}", still.display()).into());
        }
        if !is_image(still) {
            return Err(format!("Not a supported image: {}", still.display()).into());
        }
    }
    if cli.width == 0 || cli.height == 0 {
        return Err(format!(
            "Frame size must be positive, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    if cli.interval_ms == 0 {
        return Err("Interval must be at least 1 ms".into());
    }
    if !(0.0..=1.0).contains(&cli.min_confidence) {
        return Err(format!(
            "Minimum confidence must be between 0.0 and 1.0, got {}",
            cli.min_confidence
        )
        .into());
    }
    if cli.log_every == 0 {
        return Err("--log-every must be at least 1".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot_requires_path() {
        assert!(parse_command("snapshot").is_err());
        assert!(matches!(
            parse_command("snapshot out.png"),
            Ok(Some(Command::Snapshot(p))) if p == Path::new("out.png")
        ));
    }

    #[test]
    fn test_parse_blank_line_is_ignored() {
        assert!(matches!(parse_command("   "), Ok(None)));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let cli = Cli::parse_from(["emotion-mirror", "--min-confidence", "1.5"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_defaults_match_loop_defaults() {
        let cli = Cli::parse_from(["emotion-mirror"]);
        assert!(validate(&cli).is_ok());
        assert_eq!(cli.width, 640);
        assert_eq!(cli.height, 480);
        assert_eq!(
            Duration::from_millis(cli.interval_ms),
            LoopConfig::default().interval
        );
        assert_eq!(
            FaceSelection::from(cli.face_selection),
            FaceSelection::LastFace
        );
    }
}
