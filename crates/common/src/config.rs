//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CheezyError, CheezyResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where blobs and records live.
    pub storage: StorageConfig,

    /// Camera and recorder settings.
    pub capture: CaptureSettings,

    /// Card stack tuning.
    pub stack: StackSettings,

    /// Device-class policy injected into capture and layout.
    pub device: DevicePolicy,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Storage collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for local blob and record storage.
    pub data_dir: PathBuf,

    /// Metadata collection the experiences are appended to.
    pub collection: String,

    /// Path prefix for stored blobs.
    pub blob_prefix: String,

    /// When set, blob addresses resolve to `<public_base_url>/<path>`
    /// instead of `file://` URLs.
    pub public_base_url: Option<String>,
}

/// Capture controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Hard cap on recording length.
    pub max_recording_secs: u64,

    /// Delay after permission grant before the preview is reported live.
    pub warmup_ms: u64,

    /// Frame size used when the stream does not report its dimensions.
    pub fallback_width: u32,
    pub fallback_height: u32,

    /// MIME type of sampled stills.
    pub photo_mime: String,

    /// MIME type of assembled recordings.
    pub video_mime: String,
}

/// Card stack settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    /// Drag distance (absolute) that must be exceeded to commit a swipe.
    pub commit_threshold: f64,

    /// Idle auto-advance period.
    pub auto_advance_secs: u64,

    /// Number of cards rendered at once.
    pub visible_cards: usize,

    /// Scale reduction per depth level.
    pub depth_scale_step: f64,

    /// Vertical offset per depth level (px).
    pub depth_offset_px: f64,
}

/// Physical class of the client device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFactor {
    #[default]
    Desktop,
    Handheld,
}

/// Device-class policy.
///
/// Every behaviour that differs between handheld and desktop clients is a
/// field here so tests can pick it without a real device. Unset overrides
/// fall back to the form-factor default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePolicy {
    pub form_factor: FormFactor,

    /// Delegate capture to the platform picker instead of opening the camera.
    pub native_picker_capture: Option<bool>,

    /// Force the stack layout and hide the layout toggle.
    pub force_stack_layout: Option<bool>,

    /// Advance the card stack on an idle timer.
    pub auto_advance: Option<bool>,
}

impl DevicePolicy {
    pub fn desktop() -> Self {
        Self::default()
    }

    pub fn handheld() -> Self {
        Self {
            form_factor: FormFactor::Handheld,
            ..Self::default()
        }
    }

    fn is_handheld(&self) -> bool {
        self.form_factor == FormFactor::Handheld
    }

    pub fn uses_native_picker(&self) -> bool {
        self.native_picker_capture.unwrap_or(self.is_handheld())
    }

    pub fn forces_stack_layout(&self) -> bool {
        self.force_stack_layout.unwrap_or(self.is_handheld())
    }

    pub fn auto_advances(&self) -> bool {
        self.auto_advance.unwrap_or(self.is_handheld())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cheezy=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            collection: "experiences".to_string(),
            blob_prefix: "experiences".to_string(),
            public_base_url: None,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_recording_secs: 40,
            warmup_ms: 500,
            fallback_width: 640,
            fallback_height: 480,
            photo_mime: "image/png".to_string(),
            video_mime: "video/mp4".to_string(),
        }
    }
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            commit_threshold: 120.0,
            auto_advance_secs: 5,
            visible_cards: 3,
            depth_scale_step: 0.05,
            depth_offset_px: 12.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> CheezyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CheezyError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Reject values that would break the components at runtime.
    pub fn validate(&self) -> CheezyResult<()> {
        if self.storage.collection.trim().is_empty() {
            return Err(CheezyError::config("storage.collection must not be empty"));
        }
        if self.capture.max_recording_secs == 0 {
            return Err(CheezyError::config(
                "capture.max_recording_secs must be positive",
            ));
        }
        if !(self.stack.commit_threshold.is_finite() && self.stack.commit_threshold >= 0.0) {
            return Err(CheezyError::config(
                "stack.commit_threshold must be a non-negative number",
            ));
        }
        if self.stack.auto_advance_secs == 0 {
            return Err(CheezyError::config("stack.auto_advance_secs must be positive"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("CHEEZY_CONFIG") {
        return PathBuf::from(explicit);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cheezy").join("config.json")
}

/// Default data directory.
fn default_data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("cheezy")
}
