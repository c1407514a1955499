use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use zone_occupancy::config::AnalysisConfig;
use zone_occupancy::{DetectorKind, TieBreak};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ZONE_OCCUPANCY_CONFIG",
        "ZONE_OCCUPANCY_ZONES",
        "ZONE_OCCUPANCY_FRAME_CAP",
        "ZONE_OCCUPANCY_DETECTOR",
        "ZONE_OCCUPANCY_MODEL",
        "ZONE_OCCUPANCY_FONT",
        "ZONE_OCCUPANCY_PERSON_CLASS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AnalysisConfig::load().expect("load defaults");
    assert_eq!(cfg.zones_path, PathBuf::from("config_zones.json"));
    assert_eq!(cfg.batch.frame_cap, Some(300));
    assert_eq!(cfg.detector.kind, DetectorKind::Contour);
    assert_eq!(cfg.detector.threshold, 60);
    assert_eq!(cfg.detector.min_contour_area, 500.0);
    assert_eq!(cfg.live.channel_capacity, 2);
    assert_eq!(cfg.live.history_limit, Some(18_000));
    assert!(cfg.font_path.is_none());
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "zones_path": "cafe_zones.json",
        "tie_break": { "priority": ["Bar"] },
        "detector": { "backend": "stub", "threshold": 80, "min_contour_area": 250.0 },
        "batch": { "frame_cap": 120 },
        "live": { "channel_capacity": 4, "history_limit": 0 }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ZONE_OCCUPANCY_CONFIG", file.path());
    std::env::set_var("ZONE_OCCUPANCY_ZONES", "override_zones.json");
    std::env::set_var("ZONE_OCCUPANCY_FRAME_CAP", "none");
    std::env::set_var("ZONE_OCCUPANCY_PERSON_CLASS", "3");

    let cfg = AnalysisConfig::load().expect("load config");
    assert_eq!(cfg.zones_path, PathBuf::from("override_zones.json"));
    assert_eq!(cfg.tie_break, TieBreak::Priority(vec!["Bar".to_string()]));
    assert_eq!(cfg.detector.kind, DetectorKind::Stub);
    assert_eq!(cfg.detector.threshold, 80);
    assert_eq!(cfg.detector.min_contour_area, 250.0);
    assert_eq!(cfg.detector.person_class_id, 3);
    assert_eq!(cfg.batch.frame_cap, None);
    assert_eq!(cfg.live.channel_capacity, 4);
    assert_eq!(cfg.live.history_limit, None);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        zones_path = "zones/dining.json"

        [detector]
        backend = "contour"
        confidence = 0.4

        [annotate]
        font_path = "/usr/share/fonts/dejavu.ttf"
    "#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("ZONE_OCCUPANCY_CONFIG", file.path());

    let cfg = AnalysisConfig::load().expect("load config");
    assert_eq!(cfg.zones_path, PathBuf::from("zones/dining.json"));
    assert!((cfg.detector.confidence_threshold - 0.4).abs() < 1e-6);
    assert_eq!(
        cfg.font_path,
        Some(PathBuf::from("/usr/share/fonts/dejavu.ttf"))
    );

    clear_env();
}

#[test]
fn invalid_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ZONE_OCCUPANCY_FRAME_CAP", "many");
    assert!(AnalysisConfig::load().is_err());
    clear_env();

    std::env::set_var("ZONE_OCCUPANCY_DETECTOR", "yolo9000");
    assert!(AnalysisConfig::load().is_err());
    clear_env();

    std::env::set_var("ZONE_OCCUPANCY_DETECTOR", "tract");
    assert!(AnalysisConfig::load().is_err(), "tract needs a model path");
    std::env::set_var("ZONE_OCCUPANCY_MODEL", "/models/yolov8n.onnx");
    let cfg = AnalysisConfig::load().expect("tract with model");
    assert_eq!(cfg.detector.kind, DetectorKind::Tract);

    clear_env();
}

#[test]
fn malformed_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ \"batch\": ").expect("write config");
    std::env::set_var("ZONE_OCCUPANCY_CONFIG", file.path());
    assert!(AnalysisConfig::load().is_err());

    clear_env();
}
