use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use follow_cam::config::FollowerConfig;
use follow_cam::SelectionPolicy;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FOLLOW_CONFIG",
        "FOLLOW_CAMERA_DEVICE",
        "FOLLOW_SERIAL_PORT",
        "FOLLOW_SERIAL_BAUD",
        "FOLLOW_DETECTOR_BACKEND",
        "FOLLOW_MODEL_PATH",
        "FOLLOW_CENTER_BAND",
        "FOLLOW_SELECTION",
        "FOLLOW_HEADLESS",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "camera": {
                "device": "/dev/video2",
                "width": 800,
                "height": 600,
                "target_fps": 15
            },
            "serial": {
                "port": "/dev/ttyUSB0",
                "baud_rate": 115200,
                "settle_ms": 500,
                "write_timeout_ms": 1500
            },
            "detector": {
                "backend": "stub",
                "model_path": "models/yolov8s.onnx",
                "confidence_threshold": 0.4,
                "iou_threshold": 0.6
            },
            "policy": {
                "center_band_px": 100,
                "selection": "largest_area"
            },
            "display": {
                "title": "rig"
            },
            "loop": {
                "health_log_secs": 10,
                "stop_on_exit": false,
                "max_frames": 500
            }
        }"#,
    );

    std::env::set_var("FOLLOW_CONFIG", file.path());
    std::env::set_var("FOLLOW_SERIAL_PORT", "stub://motors");
    std::env::set_var("FOLLOW_CENTER_BAND", "80");
    std::env::set_var("FOLLOW_HEADLESS", "1");

    let cfg = FollowerConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "/dev/video2");
    assert_eq!((cfg.camera.width, cfg.camera.height), (800, 600));
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!(cfg.serial.port, "stub://motors");
    assert_eq!(cfg.serial.baud_rate, 115200);
    assert_eq!(cfg.serial.settle, Duration::from_millis(500));
    assert_eq!(cfg.serial.write_timeout, Some(Duration::from_millis(1500)));
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.model_path, PathBuf::from("models/yolov8s.onnx"));
    assert_eq!(cfg.detector.thresholds.confidence, 0.4);
    assert_eq!(cfg.detector.thresholds.iou, 0.6);
    assert_eq!(cfg.policy.center_band_px, 80.0);
    assert_eq!(cfg.policy.selection, SelectionPolicy::LargestArea);
    assert!(!cfg.display.enabled);
    assert_eq!(cfg.display.title, "rig");
    assert_eq!(cfg.run.health_log_interval, Duration::from_secs(10));
    assert!(!cfg.run.stop_on_exit);
    assert_eq!(cfg.run.max_frames, Some(500));

    clear_env();
}

#[test]
fn missing_file_uses_rig_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = FollowerConfig::load().expect("load defaults");
    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
    assert_eq!(cfg.serial.baud_rate, 9600);
    assert_eq!(cfg.serial.settle, Duration::from_secs(2));
    assert_eq!(cfg.serial.write_timeout, None);
    assert_eq!(cfg.policy.center_band_px, 120.0);
    assert!(cfg.display.enabled);
    assert!(cfg.run.stop_on_exit);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "detector": { "confidence_threshold": 1.5 } }"#);
    let err = FollowerConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("confidence threshold"));

    let file = write_config(r#"{ "detector": { "backend": "cuda" } }"#);
    let err = FollowerConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("unknown detector backend"));

    let file = write_config(r#"{ "policy": { "center_band_px": 320 } }"#);
    assert!(FollowerConfig::load_from(Some(file.path())).is_err());

    let file = write_config("{ not json");
    let err = FollowerConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    std::env::set_var("FOLLOW_SERIAL_BAUD", "fast");
    let err = FollowerConfig::load_from(None).unwrap_err();
    assert!(err.to_string().contains("FOLLOW_SERIAL_BAUD"));

    clear_env();
}
