//! Point-to-zone assignment.
//!
//! A point is tested against each zone with a crossing-number (ray casting) test.
//! Points exactly on an edge or vertex count as inside.
//!
//! Overlapping zones: a point inside several zones is assigned to exactly one of
//! them. The default `TieBreak::SortedName` picks the zone whose name sorts first.
//! This is deterministic but arbitrary; overlaps are not resolved by area or by
//! any notion of zone priority unless `TieBreak::Priority` is configured.

use serde::{Deserialize, Serialize};

use super::{Point, Vertex, Zone, ZoneSet};
use crate::detect::Detection;

const EDGE_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First matching zone in ascending name order.
    #[default]
    SortedName,
    /// Listed zones are tried first, in list order; unlisted zones follow in
    /// ascending name order.
    Priority(Vec<String>),
}

#[derive(Clone, Debug, Default)]
pub struct ZoneAssigner {
    tie_break: TieBreak,
}

impl ZoneAssigner {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> &TieBreak {
        &self.tie_break
    }

    /// Returns the name of the zone owning `point`, or `None`.
    pub fn assign<'z>(&self, point: Point, zones: &'z ZoneSet) -> Option<&'z str> {
        let owner = match &self.tie_break {
            TieBreak::SortedName => zones.iter().find(|zone| contains(zone, point)),
            TieBreak::Priority(order) => order
                .iter()
                .filter_map(|name| zones.get(name))
                .chain(zones.iter().filter(|zone| !order.iter().any(|n| n == zone.name())))
                .find(|zone| contains(zone, point)),
        };
        owner.map(Zone::name)
    }

    /// Assigns a detection by its bounding-box centroid.
    pub fn assign_detection<'z>(&self, detection: &Detection, zones: &'z ZoneSet) -> Option<&'z str> {
        self.assign(detection.bbox.centroid(), zones)
    }
}

/// True when `point` lies inside `zone` or on its boundary.
pub fn contains(zone: &Zone, point: Point) -> bool {
    point_in_polygon(point, zone.vertices())
}

pub fn point_in_polygon(point: Point, ring: &[Vertex]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if on_segment(point, a, b) {
            return true;
        }
        let (ax, ay) = (a.x as f64, a.y as f64);
        let (bx, by) = (b.x as f64, b.y as f64);
        if (ay > point.y) != (by > point.y) {
            let x_cross = ax + (point.y - ay) * (bx - ax) / (by - ay);
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(p: Point, a: Vertex, b: Vertex) -> bool {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let cross = (bx - ax) * (p.y - ay) - (by - ay) * (p.x - ax);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.x >= ax.min(bx) - EDGE_EPSILON
        && p.x <= ax.max(bx) + EDGE_EPSILON
        && p.y >= ay.min(by) - EDGE_EPSILON
        && p.y <= ay.max(by) + EDGE_EPSILON
}
