//! Zone Occupancy Analytics
//!
//! Counts people inside named polygonal zones of a video, frame by frame.
//!
//! # Architecture
//!
//! Every frame goes through the same pipeline:
//!
//! 1. **Detect**: a `Detector` backend returns class-tagged boxes.
//! 2. **Assign**: each person's box centroid is matched to at most one zone.
//! 3. **Aggregate**: per-zone and global counts are appended to the session history.
//! 4. **Annotate**: zones, boxes and counts are drawn on a copy of the frame.
//!
//! Two execution modes share that pipeline:
//!
//! - **Batch** (`session::run_batch`): a finite source, an optional frame cap,
//!   cooperative cancellation and a `FinalReport` at the end.
//! - **Live** (`session::LiveController`): an unbounded push feed, processed on
//!   a consumer thread that always takes the freshest frame and publishes the
//!   latest result to a single-slot cell.
//!
//! Zones are persisted as JSON (`zones::ZoneStore`) and loaded once per session.
//!
//! # Module Structure
//!
//! - `zones`: zone model, point-in-polygon assignment, JSON store
//! - `detect`: `Detector` trait and backends (scripted, contour, tract)
//! - `occupancy`: per-frame counting and history
//! - `annotate`: frame annotation
//! - `session`: session object, batch runner, live controller
//! - `ingest`: frame sources (synthetic, local files, live channel)
//! - `report`: end-of-session report and summary statistics
//! - `config`: file and environment configuration
//! - `error`: error taxonomy

pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod occupancy;
pub mod report;
pub mod session;
pub mod zones;

pub use annotate::FrameAnnotator;
pub use config::{AnalysisConfig, DetectorKind, DetectorSettings};
pub use detect::{open_backend, BoundingBox, Detection, Detector, PERSON_CLASS_ID};
pub use error::{ConfigError, DetectionError, SourceError};
pub use frame::Frame;
pub use ingest::{live_channel, FileConfig, FileSource, FramePublisher, FrameSource, LiveReceiver};
pub use occupancy::{OccupancyAggregator, OccupancyFrame};
pub use report::{Completion, FinalReport, OccupancySummary, ZoneSummary};
pub use session::{
    run_batch, BatchState, CancelToken, LatestSnapshot, LiveController, LiveSnapshot, LiveState,
    Progress, Session, SessionConfig, SessionMode, TickOutput,
};
pub use zones::{Point, TieBreak, Vertex, Zone, ZoneAssigner, ZoneSet, ZoneStore};
