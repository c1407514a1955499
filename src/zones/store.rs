//! JSON persistence for zone sets.
//!
//! On disk a zone set is a JSON object mapping zone name to its vertex ring:
//!
//! ```json
//! { "Table1": [[0, 0], [10, 0], [10, 10], [0, 10]] }
//! ```
//!
//! Older files store a list of `{"name": ..., "coords": [...]}` records; those
//! are still accepted on read and rewritten in the object layout on save.
//! Coordinates are read as numbers and truncated toward zero, so canvas
//! exports with fractional vertices still load.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{Vertex, Zone, ZoneSet};
use crate::error::ConfigError;

type RawRing = Vec<[f64; 2]>;

#[derive(Deserialize)]
#[serde(untagged)]
enum ZoneFile {
    Map(BTreeMap<String, RawRing>),
    Records(Vec<ZoneRecord>),
}

#[derive(Deserialize)]
struct ZoneRecord {
    name: String,
    coords: RawRing,
}

#[derive(Clone, Debug)]
pub struct ZoneStore {
    path: PathBuf,
}

impl ZoneStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load zones, degrading to an empty set when the file is missing or bad.
    pub fn load(&self) -> ZoneSet {
        match self.load_checked() {
            Ok(zones) => zones,
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "no zone file at {}, starting with no zones",
                    self.path.display()
                );
                ZoneSet::new()
            }
            Err(err) => {
                log::warn!("{}; continuing with no zones", err);
                ZoneSet::new()
            }
        }
    }

    /// Load zones, reporting why the file could not be used.
    ///
    /// Individual zones that fail validation are skipped with a warning; only
    /// an unreadable or unparseable file is an error.
    pub fn load_checked(&self) -> Result<ZoneSet, ConfigError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let parsed: ZoneFile = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let entries: Vec<(String, RawRing)> = match parsed {
            ZoneFile::Map(map) => map.into_iter().collect(),
            ZoneFile::Records(records) => records
                .into_iter()
                .map(|record| (record.name, record.coords))
                .collect(),
        };

        let mut zones = ZoneSet::new();
        for (name, ring) in entries {
            match vertices_from_raw(&name, &ring).and_then(|vertices| Zone::new(name, vertices)) {
                Ok(zone) => {
                    if let Some(previous) = zones.insert(zone) {
                        log::warn!(
                            "zone '{}' appears more than once in {}; keeping the last",
                            previous.name(),
                            self.path.display()
                        );
                    }
                }
                Err(err) => log::warn!("{}: skipping zone: {}", self.path.display(), err),
            }
        }
        log::info!("loaded {} zone(s) from {}", zones.len(), self.path.display());
        Ok(zones)
    }

    /// Write the zone set, replacing the file atomically.
    pub fn save(&self, zones: &ZoneSet) -> Result<(), ConfigError> {
        let map: BTreeMap<&str, &[Vertex]> =
            zones.iter().map(|z| (z.name(), z.vertices())).collect();
        let json = serde_json::to_vec_pretty(&map).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_atomic(&self.path, &json).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        log::info!("saved {} zone(s) to {}", zones.len(), self.path.display());
        Ok(())
    }

    /// Add or replace one zone on disk.
    pub fn upsert(&self, zone: Zone) -> Result<ZoneSet, ConfigError> {
        let mut zones = self.load_or_empty()?;
        zones.insert(zone);
        self.save(&zones)?;
        Ok(zones)
    }

    /// Remove one zone on disk. Returns `None` if no zone had that name.
    pub fn remove(&self, name: &str) -> Result<Option<Zone>, ConfigError> {
        let mut zones = self.load_or_empty()?;
        let removed = zones.remove(name);
        if removed.is_some() {
            self.save(&zones)?;
        }
        Ok(removed)
    }

    // Editing must not silently overwrite a file it could not parse.
    fn load_or_empty(&self) -> Result<ZoneSet, ConfigError> {
        match self.load_checked() {
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(ZoneSet::new())
            }
            other => other,
        }
    }
}

fn vertices_from_raw(name: &str, ring: &[[f64; 2]]) -> Result<Vec<Vertex>, ConfigError> {
    ring.iter()
        .map(|&[x, y]| match (pixel(x), pixel(y)) {
            (Some(x), Some(y)) => Ok(Vertex::new(x, y)),
            _ => Err(ConfigError::InvalidZone {
                name: name.to_string(),
                reason: format!("vertex [{}, {}] is not a pixel coordinate", x, y),
            }),
        })
        .collect()
}

fn pixel(value: f64) -> Option<i32> {
    let truncated = value.trunc();
    (truncated.is_finite()
        && truncated >= f64::from(i32::MIN)
        && truncated <= f64::from(i32::MAX))
    .then_some(truncated as i32)
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)
}
