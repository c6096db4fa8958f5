use glitch_frame::config::{Configuration, PixelFormat};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config_with_defaults() {
    let yaml = r#"
library-path: "/bitmaps"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.library_path, Some(PathBuf::from("/bitmaps")));
    assert_eq!(cfg.fade_in, Duration::from_millis(500));
    assert_eq!(cfg.hold, Duration::from_secs(2));
    assert_eq!(cfg.fade_out, Duration::from_millis(500));
    assert_eq!(cfg.tick_interval, Duration::from_millis(16));
    assert!(cfg.glitch.enabled);
    assert_eq!(cfg.glitch.patches_per_frame, 4);
    assert_eq!(cfg.glitch.max_offset, 3);
    assert_eq!((cfg.display.width, cfg.display.height), (64, 64));
    assert_eq!(cfg.display.initial_brightness, 128);
    assert_eq!(cfg.display.format, PixelFormat::Rgb565);
    assert!(cfg.validated().is_ok());
}

#[test]
fn parse_humantime_durations_and_nested_sections() {
    let yaml = r#"
images: [a.bmp, b.bmp]
fade-in: 250ms
hold: 3s
fade-out: 1s 500ms
tick-interval: 20ms
seed: 42
glitch:
  patches-per-frame: 7
  max-offset: 5
display:
  width: 32
  height: 16
  origin: [4, -2]
  initial-brightness: 0
  format: rgb888
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.images, vec![PathBuf::from("a.bmp"), PathBuf::from("b.bmp")]);
    let timings = cfg.timings();
    assert_eq!(timings.fade_in, Duration::from_millis(250));
    assert_eq!(timings.hold, Duration::from_secs(3));
    assert_eq!(timings.fade_out, Duration::from_millis(1500));
    assert_eq!(cfg.seed, Some(42));
    assert_eq!(cfg.glitch.patches_per_frame, 7);
    assert_eq!(cfg.display.origin, [4, -2]);
    assert_eq!(cfg.display.format, PixelFormat::Rgb888);
    assert!(cfg.validated().is_ok());
}

#[test]
fn missing_image_source_is_rejected() {
    let cfg: Configuration = serde_yaml::from_str("hold: 1s").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("library-path or images"));
}

#[test]
fn zero_tick_interval_is_rejected() {
    let yaml = r#"
library-path: "/bitmaps"
tick-interval: 0s
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn glitch_bounds_are_validated() {
    let zero_patches = r#"
library-path: "/bitmaps"
glitch:
  patches-per-frame: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(zero_patches).unwrap();
    assert!(cfg.validated().is_err());

    let disabled = r#"
library-path: "/bitmaps"
glitch:
  enabled: false
  patches-per-frame: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(disabled).unwrap();
    assert!(cfg.validated().is_ok());

    let huge_offset = r#"
library-path: "/bitmaps"
glitch:
  max-offset: 1000
"#;
    let cfg: Configuration = serde_yaml::from_str(huge_offset).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn empty_display_is_rejected() {
    let yaml = r#"
library-path: "/bitmaps"
display:
  width: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn loads_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "library-path: /srv/bitmaps\nhold: 5s\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.hold, Duration::from_secs(5));
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}
