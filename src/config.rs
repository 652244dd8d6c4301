//! campreview runtime configuration handling

#[cfg(feature = "camera")]
use crate::camera::CameraConfig;
use crate::error::{Error, Result};
#[cfg(feature = "camera")]
use crate::preview::PixelFormat;
use crate::preview::{
    DEFAULT_THRESHOLD, DeviceOrientationInfo, DisplayRotation, Facing, Resolution, ViewSize,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampreviewConfig {
    /// Camera selection and capture overrides
    pub camera: CameraOptions,
    /// Preview negotiation settings
    pub preview: PreviewOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl CampreviewConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No campreview.toml / campreview.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["campreview.toml", "campreview.yaml", "campreview.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("campreview");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.camera.apply_env_overrides();
        self.preview.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Produce a fully resolved camera configuration ready to open the V4L2 device.
    #[cfg(feature = "camera")]
    pub fn camera_config(&self) -> Result<CameraConfig> {
        self.camera.to_camera_config()
    }

    /// Produce validated preview settings.
    pub fn preview_settings(&self) -> Result<PreviewSettings> {
        self.preview.to_settings()
    }
}

/// User-friendly camera overrides that are merged on top of `CameraConfig::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Override for the numeric camera index (e.g. `/dev/video2`).
    pub device_index: Option<usize>,
    /// Override for the camera name substring match.
    pub device_name: Option<String>,
    /// Override for desired frames per second.
    pub fps: Option<u32>,
    /// Override for pixel format string (mjpeg/yuyv/nv21/rgb24).
    pub format: Option<String>,
    /// Override for number of V4L2 buffers to allocate.
    pub buffer_count: Option<u32>,
    /// Override for how long to wait on a frame, in milliseconds (0 blocks).
    pub frame_timeout_ms: Option<u64>,
    /// Degrees the sensor is mounted at; V4L2 does not report this.
    pub mount_angle: Option<u32>,
    /// Which way the camera faces (front/back); V4L2 does not report this.
    pub facing: Option<String>,
}

impl CameraOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("CAMPREVIEW_CAMERA_DEVICE") {
            self.device_name = Some(name);
            self.device_index = None;
        }
        if let Ok(index) = env::var("CAMPREVIEW_CAMERA_INDEX") {
            if let Ok(parsed) = index.parse::<usize>() {
                self.device_index = Some(parsed);
                self.device_name = None;
            }
        }
        if let Ok(fps) = env::var("CAMPREVIEW_CAMERA_FPS") {
            self.fps = fps.parse::<u32>().ok();
        }
        if let Ok(format) = env::var("CAMPREVIEW_CAMERA_FORMAT") {
            self.format = Some(format);
        }
        if let Ok(buffers) = env::var("CAMPREVIEW_CAMERA_BUFFERS") {
            self.buffer_count = buffers.parse::<u32>().ok();
        }
        if let Ok(timeout) = env::var("CAMPREVIEW_CAMERA_FRAME_TIMEOUT") {
            self.frame_timeout_ms = timeout.parse::<u64>().ok();
        }
        if let Ok(angle) = env::var("CAMPREVIEW_MOUNT_ANGLE") {
            self.mount_angle = angle.parse::<u32>().ok();
        }
        if let Ok(facing) = env::var("CAMPREVIEW_FACING") {
            self.facing = Some(facing);
        }
    }

    /// Resolve mount angle and facing, defaulting to an upright back camera.
    pub fn orientation(&self) -> Result<DeviceOrientationInfo> {
        let mut info = DeviceOrientationInfo::default();

        if let Some(angle) = self.mount_angle {
            if angle % 90 != 0 || angle >= 360 {
                return Err(Error::Config(format!(
                    "Mount angle {angle} must be one of 0, 90, 180 or 270"
                )));
            }
            info.mount_angle = angle;
        }

        if let Some(facing) = &self.facing {
            info.facing = Facing::from_str(facing)?;
        }

        Ok(info)
    }

    /// Merge overrides onto the default camera configuration.
    #[cfg(feature = "camera")]
    pub fn to_camera_config(&self) -> Result<CameraConfig> {
        let mut config = CameraConfig::default();

        if let Some(name) = &self.device_name {
            config.device_name = Some(name.clone());
            config.device_index = None;
        }

        if let Some(index) = self.device_index {
            config.device_index = Some(index);
            if self.device_name.is_none() {
                config.device_name = None;
            }
        }

        if let Some(fps) = self.fps {
            config.fps = fps.max(1);
        }

        if let Some(format) = &self.format {
            config.format = PixelFormat::parse(format).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown pixel format '{}'. Use mjpeg, yuyv, nv21, or rgb24",
                    format
                ))
            })?;
        }

        if let Some(buffers) = self.buffer_count {
            config.buffer_count = buffers.max(2);
        }

        if let Some(timeout) = self.frame_timeout_ms {
            config.frame_timeout_ms = timeout;
        }

        config.orientation = self.orientation()?;

        Ok(config)
    }
}

/// Preview negotiation overrides as written in configuration files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewOptions {
    /// Long-side threshold for picking a preview size (default 720)
    pub threshold: Option<u32>,
    /// Display rotation in degrees (0/90/180/270)
    pub display_rotation: Option<String>,
    /// Size of the preview view as `WxH`
    pub view: Option<String>,
}

impl PreviewOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(threshold) = env::var("CAMPREVIEW_THRESHOLD") {
            self.threshold = threshold.parse::<u32>().ok();
        }
        if let Ok(rotation) = env::var("CAMPREVIEW_DISPLAY_ROTATION") {
            self.display_rotation = Some(rotation);
        }
        if let Ok(view) = env::var("CAMPREVIEW_VIEW_SIZE") {
            self.view = Some(view);
        }
    }

    /// Validate and resolve into concrete settings.
    pub fn to_settings(&self) -> Result<PreviewSettings> {
        let mut settings = PreviewSettings::default();

        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }

        if let Some(rotation) = &self.display_rotation {
            settings.display_rotation = DisplayRotation::from_str(rotation)?;
        }

        if let Some(view) = &self.view {
            let res = Resolution::from_str(view)
                .map_err(|e| Error::Config(format!("Invalid view size '{view}': {e}")))?;
            settings.view = ViewSize::from(res);
        }

        Ok(settings)
    }
}

/// Resolved preview negotiation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSettings {
    /// Long-side threshold for picking a preview size
    pub threshold: u32,
    /// Rotation of the display the preview is shown on
    pub display_rotation: DisplayRotation,
    /// Size of the preview view
    pub view: ViewSize,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            display_rotation: DisplayRotation::Rot0,
            view: ViewSize::new(720, 1280),
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `CAMPREVIEW_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stdout logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("CAMPREVIEW_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("CAMPREVIEW_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("CAMPREVIEW_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("CAMPREVIEW_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}
