//! Zone model: named polygons in frame pixel coordinates.
//!
//! - `Vertex`: integer pixel coordinate, serialized as `[x, y]`.
//! - `Zone`: a named vertex ring with at least three vertices.
//! - `ZoneSet`: zones keyed by name, iterated in ascending name order.
//!
//! Vertices are expected to describe a simple polygon. Self-intersection is not
//! validated and assignment results for such polygons are unspecified.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::ConfigError;

pub mod assign;
pub mod store;

pub use assign::{TieBreak, ZoneAssigner};
pub use store::ZoneStore;

pub const MIN_ZONE_VERTICES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for Vertex {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Vertex> for [i32; 2] {
    fn from(v: Vertex) -> Self {
        [v.x, v.y]
    }
}

impl From<(i32, i32)> for Vertex {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A point in frame coordinates. Detection centroids are not pixel-aligned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Any non-empty name is accepted as long as it has no control characters,
/// which would break frame labels and console output.
pub fn validate_zone_name(name: &str) -> Result<(), ConfigError> {
    static ZONE_NAME_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = ZONE_NAME_RE.get_or_init(|| regex::Regex::new(r"^\P{Cc}+$").expect("static regex"));

    if !re.is_match(name) {
        return Err(ConfigError::InvalidZone {
            name: name.escape_debug().to_string(),
            reason: "name must be non-empty and free of control characters".to_string(),
        });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Zone {
    name: String,
    vertices: Vec<Vertex>,
}

impl Zone {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>) -> Result<Self, ConfigError> {
        let name = name.into();
        validate_zone_name(&name)?;
        if vertices.len() < MIN_ZONE_VERTICES {
            return Err(ConfigError::InvalidZone {
                name,
                reason: format!(
                    "polygon needs at least {} vertices, got {}",
                    MIN_ZONE_VERTICES,
                    vertices.len()
                ),
            });
        }
        Ok(Self { name, vertices })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Signed-area centroid (first-order moments over zeroth moment).
    ///
    /// Returns `None` for degenerate polygons with zero area.
    pub fn centroid(&self) -> Option<Point> {
        let mut area2 = 0.0f64;
        let mut cx = 0.0f64;
        let mut cy = 0.0f64;
        let n = self.vertices.len();
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let cross = a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
            area2 += cross;
            cx += (a.x as f64 + b.x as f64) * cross;
            cy += (a.y as f64 + b.y as f64) * cross;
        }
        if area2.abs() < f64::EPSILON {
            return None;
        }
        Some(Point::new(cx / (3.0 * area2), cy / (3.0 * area2)))
    }
}

/// Zones keyed by name. Iteration order is ascending by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneSet {
    zones: BTreeMap<String, Zone>,
}

impl ZoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a zone, replacing any zone with the same name. Returns the
    /// replaced zone, if any.
    pub fn insert(&mut self, zone: Zone) -> Option<Zone> {
        self.zones.insert(zone.name.clone(), zone)
    }

    pub fn remove(&mut self, name: &str) -> Option<Zone> {
        self.zones.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl FromIterator<Zone> for ZoneSet {
    fn from_iter<I: IntoIterator<Item = Zone>>(iter: I) -> Self {
        let mut set = ZoneSet::new();
        for zone in iter {
            set.insert(zone);
        }
        set
    }
}
