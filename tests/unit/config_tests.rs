// Configuration module unit tests

use image_service::config::*;
use image_service::orchestrator::CanvasSize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_can_deserialize_full_yaml_config() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
  request_timeout: 10
  max_body_size: 1024
canvas:
  width: 640
  height: 480
output:
  directory: /var/tmp/out
"#;
    let config: Config = serde_yaml::from_str(yaml).expect("Failed to deserialize YAML");

    assert_eq!(config.server.listen_address(), "127.0.0.1:8080");
    assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.server.max_body_size, 1024);
    assert_eq!(config.canvas.size(), CanvasSize::new(640, 480));
    assert_eq!(config.output.directory, PathBuf::from("/var/tmp/out"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_config_matches_built_in_values() {
    let config = Config::default();

    assert_eq!(config.server.address, "0.0.0.0");
    assert_eq!(config.server.port, 3210);
    assert_eq!(config.server.max_body_size, 32 * 1024 * 1024);
    assert_eq!(config.canvas.size(), CanvasSize::new(1024, 768));
    assert_eq!(config.output.directory, PathBuf::from("/tmp"));
}

#[test]
fn test_can_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "canvas:\n  width: 320\n  height: 200").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.canvas.size(), CanvasSize::new(320, 200));
    assert_eq!(config.server.port, 3210);
}

#[test]
fn test_missing_config_file_is_reported() {
    let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(err.starts_with("Failed to read config file"));
}

#[test]
fn test_zero_canvas_width_fails_validation() {
    let config = Config::from_yaml_with_env("canvas:\n  width: 0\n").unwrap();
    assert!(config.validate().is_err());
}
