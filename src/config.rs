//! Configuration file handling for esp-overlay.
//!
//! Loads configuration from `<config dir>/esp-overlay/config.toml` or a custom path.
//! Every section is optional; missing keys take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::CaptureKind;
use crate::hotkeys;

/// Configuration file structure for esp-overlay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub ai: AiConfig,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
    pub aim: AimConfig,
    pub hotkeys: HotkeyConfig,
    pub state: StateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub kind: CaptureKind,
    pub device_index: u32,
    /// Requested [width, height]
    pub resolution: Option<[u32; 2]>,
    pub fps: Option<u32>,
    /// Monitor number for screen capture, 1-based
    pub monitor: usize,
    /// [left, top, width, height] inside the monitor
    pub region: Option<[u32; 4]>,
    pub mirror: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            kind: CaptureKind::Webcam,
            device_index: 0,
            resolution: Some([1920, 1080]),
            fps: Some(60),
            monitor: 1,
            region: None,
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub model_path: PathBuf,
    pub conf_threshold: f32,
    pub nms_threshold: f32,
    /// Class allow-list; empty keeps every class
    pub classes: Vec<usize>,
    pub use_gpu: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov5n.onnx"),
            conf_threshold: 0.4,
            nms_threshold: 0.5,
            classes: vec![0],
            use_gpu: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub show_fps: bool,
    pub window_title: String,
    /// Where the headless presenter writes the latest rendered frame
    pub snapshot_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_fps: true,
            window_title: "ESP Overlay MVP".to_string(),
            snapshot_path: None,
        }
    }
}

/// Queues allocate every slot up front.
pub const MAX_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub frame_queue_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            frame_queue_size: 2,
        }
    }
}

impl PerformanceConfig {
    /// The result queue holds two more records than the frame queue.
    pub fn result_queue_size(&self) -> usize {
        self.frame_queue_size + 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    /// Proportional gain in (0, 1]
    pub sensitivity: f32,
    pub tick_ms: u64,
    /// Log pointer moves instead of performing them
    pub dry_run: bool,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.15,
            tick_ms: 10,
            dry_run: false,
        }
    }
}

impl AimConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub toggle_esp: String,
    pub toggle_aim: String,
    pub exit: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_esp: "F1".to_string(),
            toggle_aim: "F2".to_string(),
            exit: "F4".to_string(),
        }
    }
}

/// Initial feature toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub esp_enabled: bool,
    pub aim_enabled: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            esp_enabled: true,
            aim_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::info!("Loaded configuration from {}", path.display());
            config
        } else {
            log::info!(
                "No config file at {}, using defaults",
                path.display()
            );
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and hotkey names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("ai.conf_threshold", self.ai.conf_threshold)?;
        check_unit("ai.nms_threshold", self.ai.nms_threshold)?;

        let s = self.aim.sensitivity;
        if !(s > 0.0 && s <= 1.0) {
            return Err(invalid("aim.sensitivity", format!("{s} is not in (0, 1]")));
        }
        if self.aim.tick_ms == 0 {
            return Err(invalid("aim.tick_ms", "must be at least 1".to_string()));
        }
        let queue = self.performance.frame_queue_size;
        if !(1..=MAX_QUEUE_SIZE).contains(&queue) {
            return Err(invalid(
                "performance.frame_queue_size",
                format!("{queue} is not in [1, {MAX_QUEUE_SIZE}]"),
            ));
        }
        if self.capture.monitor == 0 {
            return Err(invalid(
                "capture.monitor",
                "monitors are numbered from 1".to_string(),
            ));
        }

        for (field, name) in [
            ("hotkeys.toggle_esp", &self.hotkeys.toggle_esp),
            ("hotkeys.toggle_aim", &self.hotkeys.toggle_aim),
            ("hotkeys.exit", &self.hotkeys.exit),
        ] {
            if hotkeys::parse_key(name).is_none() {
                return Err(invalid(field, format!("unknown key '{name}'")));
            }
        }

        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is not in [0, 1]")))
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
    Invalid {
        field: &'static str,
        reason: String,
    },
    AlreadyExists(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to access config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize configuration: {}", source)
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid configuration value for '{}': {}", field, reason)
            }
            ConfigError::AlreadyExists(path) => {
                write!(f, "Config file already exists: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
            ConfigError::Invalid { .. } | ConfigError::AlreadyExists(_) => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("esp-overlay").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.capture.kind, CaptureKind::Webcam);
        assert_eq!(config.capture.monitor, 1);
        assert_eq!(config.ai.model_path, PathBuf::from("models/yolov5n.onnx"));
        assert_eq!(config.ai.conf_threshold, 0.4);
        assert_eq!(config.ai.nms_threshold, 0.5);
        assert_eq!(config.ai.classes, vec![0]);
        assert!(!config.ai.use_gpu);
        assert_eq!(config.performance.frame_queue_size, 2);
        assert_eq!(config.performance.result_queue_size(), 4);
        assert_eq!(config.aim.tick(), Duration::from_millis(10));
        assert_eq!(config.hotkeys.exit, "F4");
        assert!(config.state.esp_enabled);
        assert!(!config.state.aim_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ai]
            conf_threshold = 0.6

            [capture]
            kind = "screen"
            region = [0, 0, 800, 600]
            "#,
        )
        .unwrap();
        assert_eq!(config.ai.conf_threshold, 0.6);
        assert_eq!(config.ai.nms_threshold, 0.5);
        assert_eq!(config.capture.kind, CaptureKind::Screen);
        assert_eq!(config.capture.region, Some([0, 0, 800, 600]));
        assert_eq!(config.aim.sensitivity, 0.15);
    }

    #[test]
    fn test_threshold_out_of_range_is_invalid() {
        let mut config = Config::default();
        config.ai.conf_threshold = 1.5;
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "ai.conf_threshold"),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_sensitivity_is_invalid() {
        let mut config = Config::default();
        config.aim.sensitivity = 0.0;
        assert!(config.validate().is_err());
        config.aim.sensitivity = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_hotkey_is_invalid() {
        let mut config = Config::default();
        config.hotkeys.toggle_aim = "Hyper".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hotkeys.toggle_aim"));
    }

    #[test]
    fn test_queue_size_bounds() {
        let mut config = Config::default();
        config.performance.frame_queue_size = 0;
        assert!(config.validate().is_err());

        config.performance.frame_queue_size = MAX_QUEUE_SIZE;
        assert!(config.validate().is_ok());

        config.performance.frame_queue_size = usize::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("performance.frame_queue_size"));
    }

    #[test]
    fn test_to_toml_parses_back() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[ai]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_path_ends_with_crate_dir() {
        let path = default_path();
        assert!(path.ends_with("esp-overlay/config.toml") || path.ends_with("config.toml"));
    }
}
