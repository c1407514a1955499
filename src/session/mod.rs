//! Session: one detect → assign → aggregate → annotate pipeline.
//!
//! A `Session` owns its detector, its zones (read-only for its lifetime) and
//! its occupancy history. Frames are processed strictly in the order they are
//! handed to `tick`, one detector call at a time. The batch runner and the
//! live controller both drive a session through `tick`; only frame delivery
//! and termination differ between them.

use image::RgbImage;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::annotate::FrameAnnotator;
use crate::config::AnalysisConfig;
use crate::detect::{Detection, Detector, PERSON_CLASS_ID};
use crate::error::DetectionError;
use crate::frame::Frame;
use crate::occupancy::{OccupancyAggregator, OccupancyFrame};
use crate::report::{Completion, FinalReport};
use crate::zones::{TieBreak, ZoneAssigner, ZoneSet};

pub mod batch;
pub mod live;
mod progress;

pub use batch::{run_batch, BatchState};
pub use live::{LatestSnapshot, LiveController, LiveSnapshot, LiveState};
pub use progress::Progress;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Batch,
    Live,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub mode: SessionMode,
    /// Batch only: stop after this many frames have been read.
    pub frame_budget: Option<u64>,
    /// Live only: bound on retained history.
    pub history_limit: Option<usize>,
    pub tie_break: TieBreak,
    pub person_class_id: u32,
}

impl SessionConfig {
    pub fn batch(frame_budget: Option<u64>) -> Self {
        Self {
            mode: SessionMode::Batch,
            frame_budget,
            history_limit: None,
            tie_break: TieBreak::default(),
            person_class_id: PERSON_CLASS_ID,
        }
    }

    pub fn live(history_limit: Option<usize>) -> Self {
        Self {
            mode: SessionMode::Live,
            frame_budget: None,
            history_limit,
            tie_break: TieBreak::default(),
            person_class_id: PERSON_CLASS_ID,
        }
    }

    pub fn from_config(mode: SessionMode, cfg: &AnalysisConfig) -> Self {
        let base = match mode {
            SessionMode::Batch => Self::batch(cfg.batch.frame_cap),
            SessionMode::Live => Self::live(cfg.live.history_limit),
        };
        Self {
            tie_break: cfg.tie_break.clone(),
            person_class_id: cfg.detector.person_class_id,
            ..base
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

/// Cooperative cancellation flag, checked between frames.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of processing one frame.
#[derive(Clone, Debug)]
pub struct TickOutput {
    pub occupancy: OccupancyFrame,
    pub detections: Vec<Detection>,
    pub annotated: RgbImage,
}

pub struct Session {
    config: SessionConfig,
    zones: Arc<ZoneSet>,
    detector: Box<dyn Detector>,
    aggregator: OccupancyAggregator,
    annotator: FrameAnnotator,
    elapsed_frames: u64,
    skipped_frames: Vec<u64>,
    started_at: Instant,
}

impl Session {
    pub fn start(
        config: SessionConfig,
        zones: impl Into<Arc<ZoneSet>>,
        mut detector: Box<dyn Detector>,
    ) -> Self {
        let zones = zones.into();
        if let Err(err) = detector.warm_up() {
            log::warn!("detector warm-up failed: {}", err);
        }
        let history_limit = match config.mode {
            SessionMode::Batch => None,
            SessionMode::Live => config.history_limit,
        };
        let aggregator = OccupancyAggregator::new(
            config.person_class_id,
            ZoneAssigner::new(config.tie_break.clone()),
        )
        .with_history_limit(history_limit);
        let annotator = FrameAnnotator::default().with_person_class(config.person_class_id);

        log::info!(
            "{:?} session started: {} zone(s), detector '{}', frame budget {}",
            config.mode,
            zones.len(),
            detector.name(),
            config
                .frame_budget
                .map_or_else(|| "none".to_string(), |n| n.to_string())
        );

        Self {
            config,
            zones,
            detector,
            aggregator,
            annotator,
            elapsed_frames: 0,
            skipped_frames: Vec::new(),
            started_at: Instant::now(),
        }
    }

    pub fn with_annotator(mut self, annotator: FrameAnnotator) -> Self {
        self.annotator = annotator.with_person_class(self.config.person_class_id);
        self
    }

    pub fn mode(&self) -> SessionMode {
        self.config.mode
    }

    pub fn zones(&self) -> &Arc<ZoneSet> {
        &self.zones
    }

    pub fn frame_budget(&self) -> Option<u64> {
        match self.config.mode {
            SessionMode::Batch => self.config.frame_budget,
            SessionMode::Live => None,
        }
    }

    /// Frames handed to `tick`, including those whose detection failed.
    pub fn elapsed_frames(&self) -> u64 {
        self.elapsed_frames
    }

    pub fn budget_exhausted(&self) -> bool {
        self.frame_budget()
            .is_some_and(|budget| self.elapsed_frames >= budget)
    }

    pub fn skipped_frames(&self) -> &[u64] {
        &self.skipped_frames
    }

    pub fn history(&self) -> impl Iterator<Item = &OccupancyFrame> {
        self.aggregator.history()
    }

    pub fn latest(&self) -> Option<&OccupancyFrame> {
        self.aggregator.latest()
    }

    /// Run one frame through the pipeline.
    ///
    /// A detection failure skips the frame: nothing is appended to history
    /// and the frame index is recorded as skipped.
    pub fn tick(&mut self, frame: Frame) -> Result<TickOutput, DetectionError> {
        self.elapsed_frames += 1;
        let detections = match self.detector.detect(&frame.image) {
            Ok(detections) => detections,
            Err(err) => {
                self.skipped_frames.push(frame.index);
                return Err(err);
            }
        };
        let occupancy = self.aggregator.observe(frame.index, &detections, &self.zones);
        let annotated = self.annotator.annotate(
            &frame.image,
            &detections,
            &self.zones,
            &occupancy.per_zone_counts,
        );
        Ok(TickOutput {
            occupancy,
            detections,
            annotated,
        })
    }

    pub fn end(self, completion: Completion) -> FinalReport {
        log::info!(
            "{:?} session ended after {} frame(s) in {:.2}s: {}",
            self.config.mode,
            self.elapsed_frames,
            self.started_at.elapsed().as_secs_f64(),
            completion
        );
        let evicted = self.aggregator.evicted();
        let mut report = FinalReport::new(
            self.config.mode,
            completion,
            &self.zones,
            self.elapsed_frames,
            self.aggregator.into_history(),
        );
        report.skipped_frames = self.skipped_frames;
        report.evicted_frames = evicted;
        report
    }
}
