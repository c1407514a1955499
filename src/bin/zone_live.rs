//! zone_live - live zone occupancy over a paced frame feed
//!
//! A capture thread replays a source (a `stub://` scene or a local file) at a
//! fixed frame rate into a non-blocking live channel. The live controller
//! processes the freshest frame on its own thread, and the main thread prints
//! the latest counts once per second until the feed ends, `--seconds` elapse,
//! or Ctrl-C is pressed.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use zone_occupancy::{
    live_channel, open_backend, AnalysisConfig, CancelToken, DetectorKind, FileConfig, FileSource,
    FrameAnnotator, FrameSource, LiveController, LiveState, Session, SessionConfig, SessionMode,
    ZoneStore,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Feed to replay: stub://<name> or a local video file.
    #[arg(long, default_value = "stub://live")]
    source: String,
    /// Zone configuration file (overrides configuration).
    #[arg(long, env = "ZONE_OCCUPANCY_ZONES")]
    zones: Option<PathBuf>,
    /// Capture frame rate.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Stop after this many seconds (runs until Ctrl-C when omitted).
    #[arg(long)]
    seconds: Option<u64>,
    /// Detector backend (contour|stub|tract).
    #[arg(long)]
    detector: Option<DetectorKind>,
    /// Write the final report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("--fps must be at least 1"));
    }
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut cfg = AnalysisConfig::load()?;
    if let Some(zones) = args.zones {
        cfg.zones_path = zones;
    }
    if let Some(kind) = args.detector {
        cfg.detector.kind = kind;
    }

    let zones = {
        let _stage = ui.stage("Load zones");
        ZoneStore::new(&cfg.zones_path).load()
    };
    let detector = {
        let _stage = ui.stage("Load detector");
        open_backend(&cfg.detector)?
    };
    let annotator = match &cfg.font_path {
        Some(path) => FrameAnnotator::with_font_file(path)?,
        None => FrameAnnotator::default(),
    };
    let source_config = FileConfig {
        path: args.source.clone(),
        synthetic_frames: u64::MAX,
        ..FileConfig::default()
    };

    let session = Session::start(
        SessionConfig::from_config(SessionMode::Live, &cfg),
        zones,
        detector,
    )
    .with_annotator(annotator);
    let mut controller = LiveController::new(session);
    let snapshot = controller.snapshot();
    let (mut publisher, receiver) = live_channel(cfg.live.channel_capacity);
    controller.start(receiver)?;

    let shutdown = CancelToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let capture_stop = shutdown.clone();
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(args.fps));
    let capture = std::thread::Builder::new()
        .name("live-capture".to_string())
        .spawn(move || {
            // Decoders stay on the thread that opened them.
            let mut source = match FileSource::open(source_config) {
                Ok(source) => source,
                Err(err) => {
                    log::error!("failed to open live source: {:#}", err);
                    return;
                }
            };
            while !capture_stop.is_cancelled() {
                let tick = Instant::now();
                match source.next_frame() {
                    Ok(Some(frame)) => {
                        if let Err(err) = publisher.publish(frame.image) {
                            log::info!("capture stopping: {}", err);
                            break;
                        }
                    }
                    Ok(None) => {
                        log::info!("capture source exhausted");
                        break;
                    }
                    Err(err) => {
                        log::error!("{}", err);
                        break;
                    }
                }
                if let Some(rest) = frame_interval.checked_sub(tick.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
            // Dropping the publisher closes the feed.
        })?;

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let mut last_seen = 0u64;
    log::info!("zone_live running. press Ctrl-C to stop");
    while controller.state() == LiveState::Streaming {
        if shutdown.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        std::thread::sleep(Duration::from_secs(1));
        if snapshot.updates() == last_seen {
            continue;
        }
        last_seen = snapshot.updates();
        if let Some(latest) = snapshot.latest() {
            let zones: Vec<String> = latest
                .occupancy
                .per_zone_counts
                .iter()
                .map(|(name, count)| format!("{}={}", name, count))
                .collect();
            println!(
                "frame {:>6}  people {:>3}  {}",
                latest.occupancy.frame_index,
                latest.occupancy.global_person_count,
                zones.join(" ")
            );
        }
    }

    shutdown.cancel();
    controller.stop();
    capture
        .join()
        .map_err(|_| anyhow!("capture thread panicked"))?;
    let report = {
        let _stage = ui.stage("Stop live session");
        controller.join()?
    };
    println!("{}", report.status_line());
    if let Some(path) = &args.report {
        std::fs::write(path, report.to_json_pretty()?)
            .map_err(|e| anyhow!("failed to write report {}: {}", path.display(), e))?;
        println!("report written to {}", path.display());
    }
    Ok(())
}
