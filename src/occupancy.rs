//! Per-frame occupancy aggregation.
//!
//! `OccupancyAggregator::observe` turns one frame's detections into an
//! `OccupancyFrame` and appends it to the session history:
//! - only detections of the person class are counted
//! - each person is assigned to at most one zone by its box centroid
//! - `global_person_count` counts every person, matched to a zone or not
//!
//! There is no de-duplication: observing the same frame index twice appends two
//! entries. Callers supply strictly increasing indices.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::detect::Detection;
use crate::zones::{ZoneAssigner, ZoneSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OccupancyFrame {
    pub frame_index: u64,
    /// One entry per configured zone, zero when empty.
    pub per_zone_counts: BTreeMap<String, u32>,
    pub global_person_count: u32,
}

impl OccupancyFrame {
    pub fn count_for(&self, zone: &str) -> u32 {
        self.per_zone_counts.get(zone).copied().unwrap_or(0)
    }

    /// People inside some zone.
    pub fn zoned_count(&self) -> u32 {
        self.per_zone_counts.values().sum()
    }

    /// People outside every zone.
    pub fn unzoned_count(&self) -> u32 {
        self.global_person_count - self.zoned_count()
    }
}

pub struct OccupancyAggregator {
    person_class_id: u32,
    assigner: ZoneAssigner,
    history: VecDeque<OccupancyFrame>,
    history_limit: Option<usize>,
    evicted: u64,
}

impl OccupancyAggregator {
    pub fn new(person_class_id: u32, assigner: ZoneAssigner) -> Self {
        Self {
            person_class_id,
            assigner,
            history: VecDeque::new(),
            history_limit: None,
            evicted: 0,
        }
    }

    /// Keep at most `limit` entries, evicting the oldest. `None` is unbounded.
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit.map(|l| l.max(1));
        self
    }

    pub fn person_class_id(&self) -> u32 {
        self.person_class_id
    }

    pub fn assigner(&self) -> &ZoneAssigner {
        &self.assigner
    }

    /// Count people per zone for one frame and append the result to history.
    pub fn observe(
        &mut self,
        frame_index: u64,
        detections: &[Detection],
        zones: &ZoneSet,
    ) -> OccupancyFrame {
        let mut per_zone_counts: BTreeMap<String, u32> =
            zones.names().map(|name| (name.to_string(), 0)).collect();
        let mut global_person_count = 0u32;

        for det in detections.iter().filter(|d| d.class_id == self.person_class_id) {
            global_person_count += 1;
            if let Some(zone) = self.assigner.assign_detection(det, zones) {
                if let Some(count) = per_zone_counts.get_mut(zone) {
                    *count += 1;
                }
            }
        }

        let frame = OccupancyFrame {
            frame_index,
            per_zone_counts,
            global_person_count,
        };
        log::debug!(
            "frame {}: {} people, {} in zones",
            frame.frame_index,
            frame.global_person_count,
            frame.zoned_count()
        );
        self.push(frame.clone());
        frame
    }

    fn push(&mut self, frame: OccupancyFrame) {
        if let Some(limit) = self.history_limit {
            while self.history.len() >= limit {
                self.history.pop_front();
                self.evicted += 1;
            }
        }
        self.history.push_back(frame);
    }

    pub fn history(&self) -> impl Iterator<Item = &OccupancyFrame> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&OccupancyFrame> {
        self.history.back()
    }

    /// Count for `zone` in each retained frame, zero where it was absent.
    pub fn zone_series(&self, zone: &str) -> Vec<u32> {
        self.history.iter().map(|f| f.count_for(zone)).collect()
    }

    pub fn global_series(&self) -> Vec<u32> {
        self.history.iter().map(|f| f.global_person_count).collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Entries dropped by the history limit.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn into_history(self) -> Vec<OccupancyFrame> {
        self.history.into()
    }
}
