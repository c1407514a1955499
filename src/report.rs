//! End-of-session report.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::occupancy::OccupancyFrame;
use crate::session::SessionMode;
use crate::zones::ZoneSet;

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    /// The source was exhausted.
    Complete,
    /// The frame cap was reached before the source ran out.
    Truncated { cap: u64 },
    /// The source failed; history up to the failure is kept.
    Failed { reason: String },
    Cancelled,
    /// A live session was stopped.
    Stopped,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Complete => write!(f, "analysis complete"),
            Completion::Truncated { cap } => write!(f, "analysis truncated at {} frames", cap),
            Completion::Failed { reason } => write!(f, "analysis failed: {}", reason),
            Completion::Cancelled => write!(f, "analysis cancelled"),
            Completion::Stopped => write!(f, "live session stopped"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub mean: f64,
    pub max: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OccupancySummary {
    pub frames_analysed: usize,
    pub global_mean: f64,
    pub global_max: u32,
    pub zones: BTreeMap<String, ZoneSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FinalReport {
    pub mode: SessionMode,
    pub completion: Completion,
    /// Frames taken from the source, including skipped ones.
    pub frames_read: u64,
    /// Frames whose detection failed.
    pub skipped_frames: Vec<u64>,
    /// Live frames discarded by backpressure.
    pub dropped_frames: u64,
    /// Live history entries evicted by the history limit.
    pub evicted_frames: u64,
    pub zone_names: Vec<String>,
    pub history: Vec<OccupancyFrame>,
    pub summary: OccupancySummary,
}

impl FinalReport {
    pub(crate) fn new(
        mode: SessionMode,
        completion: Completion,
        zones: &ZoneSet,
        frames_read: u64,
        history: Vec<OccupancyFrame>,
    ) -> Self {
        let zone_names: Vec<String> = zones.names().map(str::to_string).collect();
        let summary = summarize(&zone_names, &history);
        Self {
            mode,
            completion,
            frames_read,
            skipped_frames: Vec::new(),
            dropped_frames: 0,
            evicted_frames: 0,
            zone_names,
            history,
            summary,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.completion, Completion::Truncated { .. })
    }

    /// One-line human summary of the outcome.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{} ({} frames read, {} analysed",
            self.completion,
            self.frames_read,
            self.history.len()
        );
        if !self.skipped_frames.is_empty() {
            line.push_str(&format!(", {} skipped", self.skipped_frames.len()));
        }
        if self.dropped_frames > 0 {
            line.push_str(&format!(", {} dropped", self.dropped_frames));
        }
        if self.evicted_frames > 0 {
            line.push_str(&format!(", {} evicted", self.evicted_frames));
        }
        line.push(')');
        line
    }

    pub fn frame_indices(&self) -> Vec<u64> {
        self.history.iter().map(|f| f.frame_index).collect()
    }

    pub fn zone_series(&self, zone: &str) -> Vec<u32> {
        self.history.iter().map(|f| f.count_for(zone)).collect()
    }

    pub fn global_series(&self) -> Vec<u32> {
        self.history.iter().map(|f| f.global_person_count).collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn summarize(zone_names: &[String], history: &[OccupancyFrame]) -> OccupancySummary {
    let (global_mean, global_max) = mean_max(history.iter().map(|f| f.global_person_count));
    let zones = zone_names
        .iter()
        .map(|name| {
            let (mean, max) = mean_max(history.iter().map(|f| f.count_for(name)));
            (name.clone(), ZoneSummary { mean, max })
        })
        .collect();
    OccupancySummary {
        frames_analysed: history.len(),
        global_mean,
        global_max,
        zones,
    }
}

fn mean_max(values: impl Iterator<Item = u32>) -> (f64, u32) {
    let mut sum = 0u64;
    let mut max = 0u32;
    let mut n = 0u64;
    for v in values {
        sum += u64::from(v);
        max = max.max(v);
        n += 1;
    }
    if n == 0 {
        (0.0, 0)
    } else {
        (sum as f64 / n as f64, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::{Vertex, Zone};

    fn frame(index: u64, table: u32, global: u32) -> OccupancyFrame {
        OccupancyFrame {
            frame_index: index,
            per_zone_counts: [("Table1".to_string(), table)].into_iter().collect(),
            global_person_count: global,
        }
    }

    fn zones() -> ZoneSet {
        let zone = Zone::new(
            "Table1",
            vec![Vertex::new(0, 0), Vertex::new(4, 0), Vertex::new(4, 4)],
        )
        .unwrap();
        [zone].into_iter().collect()
    }

    #[test]
    fn summary_matches_history() {
        let history = vec![frame(0, 1, 2), frame(1, 3, 3), frame(2, 2, 4)];
        let report = FinalReport::new(
            SessionMode::Batch,
            Completion::Complete,
            &zones(),
            3,
            history,
        );
        assert!(report.is_complete());
        assert_eq!(report.summary.frames_analysed, 3);
        assert_eq!(report.summary.global_max, 4);
        assert!((report.summary.global_mean - 3.0).abs() < 1e-9);
        assert_eq!(report.summary.zones["Table1"].max, 3);
        assert!((report.summary.zones["Table1"].mean - 2.0).abs() < 1e-9);
        assert_eq!(report.zone_series("Table1"), vec![1, 3, 2]);
        assert_eq!(report.global_series(), vec![2, 3, 4]);
        assert_eq!(report.frame_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn empty_history_summarizes_to_zero() {
        let report = FinalReport::new(
            SessionMode::Live,
            Completion::Stopped,
            &zones(),
            0,
            Vec::new(),
        );
        assert_eq!(report.summary.global_max, 0);
        assert_eq!(report.summary.global_mean, 0.0);
        assert!(!report.is_complete());
    }

    #[test]
    fn truncation_is_labelled() {
        let mut report = FinalReport::new(
            SessionMode::Batch,
            Completion::Truncated { cap: 300 },
            &zones(),
            300,
            vec![frame(0, 0, 0)],
        );
        report.skipped_frames.push(7);
        assert!(report.is_truncated());
        assert!(!report.is_complete());
        let line = report.status_line();
        assert!(line.starts_with("analysis truncated at 300 frames"));
        assert!(line.contains("1 skipped"));
    }

    #[test]
    fn trimmed_live_history_is_labelled() {
        let mut report = FinalReport::new(
            SessionMode::Live,
            Completion::Stopped,
            &zones(),
            5,
            vec![frame(3, 1, 1), frame(4, 0, 1)],
        );
        assert!(!report.status_line().contains("evicted"));
        report.evicted_frames = 3;
        report.dropped_frames = 2;
        assert_eq!(
            report.status_line(),
            "live session stopped (5 frames read, 2 analysed, 2 dropped, 3 evicted)"
        );
    }

    #[test]
    fn report_serializes_completion_tag() {
        let report = FinalReport::new(
            SessionMode::Batch,
            Completion::Failed {
                reason: "decoder gave up".to_string(),
            },
            &zones(),
            1,
            vec![frame(0, 1, 1)],
        );
        let value: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["completion"]["status"], "failed");
        assert_eq!(value["completion"]["reason"], "decoder gave up");
        assert_eq!(value["mode"], "batch");
        assert_eq!(value["history"][0]["per_zone_counts"]["Table1"], 1);
    }
}
