use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::{DetectionThresholds, BACKEND_NAMES};
use crate::frame::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
use crate::policy::{PolicySettings, SelectionPolicy, DEFAULT_CENTER_BAND_PX, DEFAULT_TARGET_LABEL};

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";
const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_SETTLE_MS: u64 = 2000;
const DEFAULT_BACKEND: &str = "tract";
const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_WINDOW_TITLE: &str = "follow-cam";
const DEFAULT_HEALTH_LOG_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct FollowerConfigFile {
    camera: Option<CameraConfigFile>,
    serial: Option<SerialConfigFile>,
    detector: Option<DetectorConfigFile>,
    policy: Option<PolicyConfigFile>,
    display: Option<DisplayConfigFile>,
    #[serde(rename = "loop")]
    run: Option<LoopConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SerialConfigFile {
    port: Option<String>,
    baud_rate: Option<u32>,
    settle_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct PolicyConfigFile {
    target_label: Option<String>,
    center_band_px: Option<f32>,
    selection: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    enabled: Option<bool>,
    title: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoopConfigFile {
    health_log_secs: Option<u64>,
    stop_on_exit: Option<bool>,
    max_frames: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct FollowerConfig {
    pub camera: CameraSettings,
    pub serial: SerialSettings,
    pub detector: DetectorSettings,
    pub policy: PolicySettings,
    pub display: DisplaySettings,
    pub run: LoopSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    /// Device node, or `stub://<name>` for the synthetic scene.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// End the stream after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            target_fps: DEFAULT_CAMERA_FPS,
            frame_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    /// Serial device, or `stub://<name>` to only log commands.
    pub port: String,
    pub baud_rate: u32,
    /// Wait after opening the port before the first write.
    pub settle: Duration,
    /// Give up on a stalled write after this long; `None` blocks.
    pub write_timeout: Option<Duration>,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            write_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub thresholds: DetectionThresholds,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            input_size: DEFAULT_INPUT_SIZE,
            thresholds: DetectionThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub title: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub health_log_interval: Duration,
    /// Send a final STOP when the loop exits.
    pub stop_on_exit: bool,
    pub max_frames: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            health_log_interval: Duration::from_secs(DEFAULT_HEALTH_LOG_SECS),
            stop_on_exit: true,
            max_frames: None,
        }
    }
}

impl FollowerConfig {
    /// Load from `FOLLOW_CONFIG` (if set), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FOLLOW_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit config file (if any), then apply environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FollowerConfigFile) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let camera_defaults = CameraSettings::default();
        let camera = CameraSettings {
            device: camera_file.device.unwrap_or(camera_defaults.device),
            width: camera_file.width.unwrap_or(camera_defaults.width),
            height: camera_file.height.unwrap_or(camera_defaults.height),
            target_fps: camera_file.target_fps.unwrap_or(camera_defaults.target_fps),
            frame_limit: camera_file.frame_limit,
        };

        let serial_file = file.serial.unwrap_or_default();
        let serial = SerialSettings {
            port: serial_file
                .port
                .unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string()),
            baud_rate: serial_file.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
            settle: Duration::from_millis(serial_file.settle_ms.unwrap_or(DEFAULT_SETTLE_MS)),
            write_timeout: serial_file
                .write_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        };

        let detector_file = file.detector.unwrap_or_default();
        let default_thresholds = DetectionThresholds::default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: detector_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            thresholds: DetectionThresholds {
                confidence: detector_file
                    .confidence_threshold
                    .unwrap_or(default_thresholds.confidence),
                iou: detector_file
                    .iou_threshold
                    .unwrap_or(default_thresholds.iou),
            },
        };

        let policy_file = file.policy.unwrap_or_default();
        let policy = PolicySettings {
            target_label: policy_file
                .target_label
                .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
            center_band_px: policy_file
                .center_band_px
                .unwrap_or(DEFAULT_CENTER_BAND_PX),
            selection: match policy_file.selection.as_deref() {
                Some(value) => SelectionPolicy::parse(value)?,
                None => SelectionPolicy::default(),
            },
        };

        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            enabled: display_file.enabled.unwrap_or(true),
            title: display_file
                .title
                .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
        };

        let run_file = file.run.unwrap_or_default();
        let run = LoopSettings {
            health_log_interval: Duration::from_secs(
                run_file.health_log_secs.unwrap_or(DEFAULT_HEALTH_LOG_SECS),
            ),
            stop_on_exit: run_file.stop_on_exit.unwrap_or(true),
            max_frames: run_file.max_frames,
        };

        Ok(Self {
            camera,
            serial,
            detector,
            policy,
            display,
            run,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(device) = non_empty_env("FOLLOW_CAMERA_DEVICE") {
            self.camera.device = device;
        }
        if let Some(port) = non_empty_env("FOLLOW_SERIAL_PORT") {
            self.serial.port = port;
        }
        if let Some(baud) = non_empty_env("FOLLOW_SERIAL_BAUD") {
            self.serial.baud_rate = baud
                .parse()
                .map_err(|_| anyhow!("FOLLOW_SERIAL_BAUD must be an integer baud rate"))?;
        }
        if let Some(backend) = non_empty_env("FOLLOW_DETECTOR_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = non_empty_env("FOLLOW_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(band) = non_empty_env("FOLLOW_CENTER_BAND") {
            self.policy.center_band_px = band
                .parse()
                .map_err(|_| anyhow!("FOLLOW_CENTER_BAND must be a number of pixels"))?;
        }
        if let Some(selection) = non_empty_env("FOLLOW_SELECTION") {
            self.policy.selection = SelectionPolicy::parse(&selection)?;
        }
        if let Some(headless) = non_empty_env("FOLLOW_HEADLESS") {
            self.display.enabled = !parse_bool(&headless)
                .ok_or_else(|| anyhow!("FOLLOW_HEADLESS must be true/false/1/0"))?;
        }
        Ok(())
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&mut self) -> Result<()> {
        if self.camera.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!(
                "camera resolution must be non-zero (got {}x{})",
                self.camera.width,
                self.camera.height
            ));
        }
        if self.serial.port.trim().is_empty() {
            return Err(anyhow!("serial port must not be empty"));
        }
        if self.serial.baud_rate == 0 {
            return Err(anyhow!("serial baud rate must be greater than zero"));
        }

        self.detector.backend = self.detector.backend.trim().to_lowercase();
        if !BACKEND_NAMES.contains(&self.detector.backend.as_str()) {
            return Err(anyhow!(
                "unknown detector backend '{}' (expected one of {:?})",
                self.detector.backend,
                BACKEND_NAMES
            ));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        let thresholds = self.detector.thresholds;
        if !(0.0..=1.0).contains(&thresholds.confidence) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1] (got {})",
                thresholds.confidence
            ));
        }
        if !(0.0..=1.0).contains(&thresholds.iou) {
            return Err(anyhow!(
                "iou threshold must be within [0, 1] (got {})",
                thresholds.iou
            ));
        }

        if self.policy.target_label.trim().is_empty() {
            return Err(anyhow!("target label must not be empty"));
        }
        let band = self.policy.center_band_px;
        if !band.is_finite() || band < 0.0 {
            return Err(anyhow!("center band must be a non-negative number of pixels"));
        }
        if band >= self.camera.width as f32 / 2.0 {
            return Err(anyhow!(
                "center band {} px leaves no room to turn in a {} px wide frame",
                band,
                self.camera.width
            ));
        }

        if self.run.health_log_interval.is_zero() {
            return Err(anyhow!("health log interval must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FollowerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rig_contract() -> Result<()> {
        let mut cfg = FollowerConfig::from_file(FollowerConfigFile::default())?;
        cfg.validate()?;
        assert_eq!(cfg.camera.width, 640);
        assert_eq!(cfg.camera.height, 480);
        assert_eq!(cfg.serial.baud_rate, 9600);
        assert_eq!(cfg.serial.settle, Duration::from_secs(2));
        assert_eq!(cfg.serial.write_timeout, None);
        assert_eq!(cfg.detector.thresholds.confidence, 0.5);
        assert_eq!(cfg.detector.thresholds.iou, 0.7);
        assert_eq!(cfg.policy.center_band_px, 120.0);
        assert_eq!(cfg.policy.target_label, "person");
        assert_eq!(cfg.policy.selection, SelectionPolicy::LastDetection);
        assert!(cfg.run.stop_on_exit);
        Ok(())
    }

    #[test]
    fn rejects_band_wider_than_half_frame() -> Result<()> {
        let mut cfg = FollowerConfig::from_file(FollowerConfigFile::default())?;
        cfg.policy.center_band_px = 320.0;
        assert!(cfg.validate().is_err());
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_thresholds() -> Result<()> {
        let mut cfg = FollowerConfig::from_file(FollowerConfigFile::default())?;
        cfg.detector.thresholds.confidence = 1.5;
        assert!(cfg.validate().is_err());
        Ok(())
    }

    #[test]
    fn normalizes_backend_name() -> Result<()> {
        let mut cfg = FollowerConfig::from_file(FollowerConfigFile::default())?;
        cfg.detector.backend = " Stub ".to_string();
        cfg.validate()?;
        assert_eq!(cfg.detector.backend, "stub");
        Ok(())
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
