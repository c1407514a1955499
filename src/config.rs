use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::zones::TieBreak;

const DEFAULT_ZONES_PATH: &str = "config_zones.json";
const DEFAULT_FRAME_CAP: u64 = 300;
const DEFAULT_THRESHOLD: u8 = 60;
const DEFAULT_MIN_CONTOUR_AREA: f64 = 500.0;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.45;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_PERSON_CLASS: u32 = 0;
const DEFAULT_LIVE_CAPACITY: usize = 2;
/// 30 minutes at 10 fps.
const DEFAULT_LIVE_HISTORY: usize = 18_000;

#[derive(Debug, Deserialize, Default)]
struct AnalysisConfigFile {
    zones_path: Option<PathBuf>,
    tie_break: Option<TieBreak>,
    detector: Option<DetectorConfigFile>,
    batch: Option<BatchConfigFile>,
    live: Option<LiveConfigFile>,
    annotate: Option<AnnotateConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<DetectorKind>,
    model_path: Option<PathBuf>,
    threshold: Option<u8>,
    min_contour_area: Option<f64>,
    confidence: Option<f32>,
    iou: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    person_class_id: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct BatchConfigFile {
    /// `0` disables the cap.
    frame_cap: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LiveConfigFile {
    channel_capacity: Option<usize>,
    history_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotateConfigFile {
    font_path: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Contour,
    Stub,
    Tract,
}

impl std::str::FromStr for DetectorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "contour" => Ok(DetectorKind::Contour),
            "stub" => Ok(DetectorKind::Stub),
            "tract" => Ok(DetectorKind::Tract),
            other => Err(anyhow!("unknown detector backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub zones_path: PathBuf,
    pub tie_break: TieBreak,
    pub detector: DetectorSettings,
    pub batch: BatchSettings,
    pub live: LiveSettings,
    pub font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub kind: DetectorKind,
    pub model_path: Option<PathBuf>,
    pub threshold: u8,
    pub min_contour_area: f64,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub input_width: u32,
    pub input_height: u32,
    pub person_class_id: u32,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// `None` processes the whole source.
    pub frame_cap: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub channel_capacity: usize,
    pub history_limit: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        // Defaults never fail validation.
        Self::from_file(AnalysisConfigFile::default())
    }
}

impl AnalysisConfig {
    /// Load from `ZONE_OCCUPANCY_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ZONE_OCCUPANCY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnalysisConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            kind: detector.backend.unwrap_or_default(),
            model_path: detector.model_path,
            threshold: detector.threshold.unwrap_or(DEFAULT_THRESHOLD),
            min_contour_area: detector.min_contour_area.unwrap_or(DEFAULT_MIN_CONTOUR_AREA),
            confidence_threshold: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            iou_threshold: detector.iou.unwrap_or(DEFAULT_IOU),
            input_width: detector.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
            input_height: detector.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
            person_class_id: detector.person_class_id.unwrap_or(DEFAULT_PERSON_CLASS),
        };
        let frame_cap = file
            .batch
            .and_then(|batch| batch.frame_cap)
            .unwrap_or(DEFAULT_FRAME_CAP);
        let live = file.live.unwrap_or_default();
        let live = LiveSettings {
            channel_capacity: live.channel_capacity.unwrap_or(DEFAULT_LIVE_CAPACITY),
            history_limit: match live.history_limit {
                Some(0) => None,
                Some(limit) => Some(limit),
                None => Some(DEFAULT_LIVE_HISTORY),
            },
        };
        Self {
            zones_path: file
                .zones_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ZONES_PATH)),
            tie_break: file.tie_break.unwrap_or_default(),
            detector,
            batch: BatchSettings {
                frame_cap: cap_from_u64(frame_cap),
            },
            live,
            font_path: file.annotate.and_then(|annotate| annotate.font_path),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("ZONE_OCCUPANCY_ZONES") {
            if !path.trim().is_empty() {
                self.zones_path = PathBuf::from(path);
            }
        }
        if let Ok(cap) = std::env::var("ZONE_OCCUPANCY_FRAME_CAP") {
            self.batch.frame_cap = parse_frame_cap(&cap)?;
        }
        if let Ok(backend) = std::env::var("ZONE_OCCUPANCY_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.kind = backend.parse()?;
            }
        }
        if let Ok(model) = std::env::var("ZONE_OCCUPANCY_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(model));
            }
        }
        if let Ok(font) = std::env::var("ZONE_OCCUPANCY_FONT") {
            if !font.trim().is_empty() {
                self.font_path = Some(PathBuf::from(font));
            }
        }
        if let Ok(class_id) = std::env::var("ZONE_OCCUPANCY_PERSON_CLASS") {
            self.detector.person_class_id = class_id.trim().parse().map_err(|_| {
                anyhow!("ZONE_OCCUPANCY_PERSON_CLASS must be a non-negative integer class id")
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("detector confidence must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(anyhow!("detector iou must be within 0..=1"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        if self.detector.kind == DetectorKind::Tract && self.detector.model_path.is_none() {
            return Err(anyhow!("tract detector requires detector.model_path"));
        }
        if self.live.channel_capacity == 0 {
            return Err(anyhow!("live channel capacity must be at least 1"));
        }
        if let TieBreak::Priority(order) = &self.tie_break {
            for name in order {
                crate::zones::validate_zone_name(name)?;
            }
        }
        Ok(())
    }
}

/// Parse a frame cap; `0` and `none` disable it.
pub fn parse_frame_cap(value: &str) -> Result<Option<u64>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let cap: u64 = value
        .parse()
        .map_err(|_| anyhow!("frame cap must be an integer frame count or 'none'"))?;
    Ok(cap_from_u64(cap))
}

fn cap_from_u64(cap: u64) -> Option<u64> {
    if cap == 0 {
        None
    } else {
        Some(cap)
    }
}

fn read_config_file(path: &Path) -> Result<AnalysisConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.zones_path, PathBuf::from("config_zones.json"));
        assert_eq!(cfg.batch.frame_cap, Some(300));
        assert_eq!(cfg.detector.kind, DetectorKind::Contour);
        assert_eq!(cfg.detector.person_class_id, 0);
        assert_eq!(cfg.tie_break, TieBreak::SortedName);
        assert_eq!(cfg.live.channel_capacity, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn frame_cap_parsing() {
        assert_eq!(parse_frame_cap("120").unwrap(), Some(120));
        assert_eq!(parse_frame_cap("0").unwrap(), None);
        assert_eq!(parse_frame_cap(" None ").unwrap(), None);
        assert!(parse_frame_cap("lots").is_err());
    }

    #[test]
    fn toml_file_is_parsed() {
        let raw = r#"
            zones_path = "zones/cafe.json"
            tie_break = { priority = ["Bar", "Terrace"] }

            [detector]
            backend = "stub"
            person_class_id = 1

            [batch]
            frame_cap = 0
        "#;
        let file: AnalysisConfigFile = toml::from_str(raw).unwrap();
        let cfg = AnalysisConfig::from_file(file);
        assert_eq!(cfg.zones_path, PathBuf::from("zones/cafe.json"));
        assert_eq!(
            cfg.tie_break,
            TieBreak::Priority(vec!["Bar".to_string(), "Terrace".to_string()])
        );
        assert_eq!(cfg.detector.kind, DetectorKind::Stub);
        assert_eq!(cfg.detector.person_class_id, 1);
        assert_eq!(cfg.batch.frame_cap, None);
    }

    #[test]
    fn tract_without_model_is_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.detector.kind = DetectorKind::Tract;
        assert!(cfg.validate().is_err());
    }
}
