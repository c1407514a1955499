//! zone_analyze - batch zone occupancy analysis of a local video file
//!
//! Reads frames from a local file (or a `stub://` synthetic scene), counts
//! people per configured zone, and prints a summary. Optionally writes the full
//! report as JSON and the annotated frames as PNG files.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use zone_occupancy::config::parse_frame_cap;
use zone_occupancy::{
    open_backend, run_batch, AnalysisConfig, CancelToken, Completion, DetectorKind, FileConfig,
    FileSource, FinalReport, FrameAnnotator, FrameSource, Session, SessionConfig, SessionMode,
    ZoneStore,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Local video file, or stub://<name> for a synthetic scene.
    #[arg(long)]
    source: String,
    /// Zone configuration file (overrides configuration).
    #[arg(long, env = "ZONE_OCCUPANCY_ZONES")]
    zones: Option<PathBuf>,
    /// Stop after this many frames (`0` or `none` disables the cap).
    #[arg(long, value_name = "N", conflicts_with = "no_frame_cap")]
    frame_cap: Option<String>,
    /// Process the whole source.
    #[arg(long)]
    no_frame_cap: bool,
    /// Detector backend (contour|stub|tract).
    #[arg(long)]
    detector: Option<DetectorKind>,
    /// Write the full report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write annotated frames as PNG into this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,
    /// TTF/OTF font for zone labels and counts.
    #[arg(long, env = "ZONE_OCCUPANCY_FONT")]
    font: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut cfg = AnalysisConfig::load()?;
    if let Some(zones) = args.zones {
        cfg.zones_path = zones;
    }
    if let Some(cap) = &args.frame_cap {
        cfg.batch.frame_cap = parse_frame_cap(cap)?;
    }
    if args.no_frame_cap {
        cfg.batch.frame_cap = None;
    }
    if let Some(kind) = args.detector {
        cfg.detector.kind = kind;
    }
    if let Some(font) = args.font {
        cfg.font_path = Some(font);
    }

    let zones = {
        let _stage = ui.stage("Load zones");
        ZoneStore::new(&cfg.zones_path).load()
    };
    if zones.is_empty() {
        log::warn!("no zones configured; only global counts will be reported");
    }
    let detector = {
        let _stage = ui.stage("Load detector");
        open_backend(&cfg.detector)?
    };
    let annotator = match &cfg.font_path {
        Some(path) => FrameAnnotator::with_font_file(path)?,
        None => FrameAnnotator::default(),
    };
    let mut source = FileSource::open(FileConfig {
        path: args.source.clone(),
        ..FileConfig::default()
    })?;
    if let Some(dir) = &args.frames_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create frames directory {}", dir.display()))?;
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let session = Session::start(
        SessionConfig::from_config(SessionMode::Batch, &cfg),
        zones,
        detector,
    )
    .with_annotator(annotator);

    let total = match (cfg.batch.frame_cap, source.len_hint()) {
        (Some(cap), Some(len)) => Some(cap.min(len)),
        (cap, len) => cap.or(len),
    };
    let mut progress = ui.frames("Analyse frames", total);
    let mut write_errors = 0u64;
    let report = run_batch(session, &mut source, &cancel, |p, output| {
        progress.set(p.processed());
        if let (Some(dir), Some(output)) = (&args.frames_dir, output) {
            let path = dir.join(format!("frame_{:06}.png", output.occupancy.frame_index));
            if let Err(err) = output.annotated.save(&path) {
                write_errors += 1;
                log::warn!("failed to write {}: {}", path.display(), err);
            }
        }
    });
    progress.finish(&report.completion.to_string());
    if write_errors > 0 {
        log::warn!("{} annotated frame(s) could not be written", write_errors);
    }

    print_summary(&report);
    if let Some(path) = &args.report {
        let _stage = ui.stage("Write report");
        write_report(path, &report)?;
    }

    match &report.completion {
        Completion::Failed { reason } => Err(anyhow!("analysis failed: {}", reason)),
        _ => Ok(()),
    }
}

fn print_summary(report: &FinalReport) {
    println!("{}", report.status_line());
    let summary = &report.summary;
    println!("frames analysed: {}", summary.frames_analysed);
    println!(
        "people (all):    mean {:.2}, max {}",
        summary.global_mean, summary.global_max
    );
    for (name, zone) in &summary.zones {
        println!("zone {:<24} mean {:.2}, max {}", name, zone.mean, zone.max);
    }
}

fn write_report(path: &Path, report: &FinalReport) -> Result<()> {
    let json = report.to_json_pretty()?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    println!("report written to {}", path.display());
    Ok(())
}
