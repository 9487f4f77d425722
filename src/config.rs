//! Configuration parsing and management for vrmotion

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::animation::{AnimationMode, ClockPolicy};
use crate::error::{ConfigError, VrmotionError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub avatar: AvatarConfig,
    pub animation: AnimationConfig,
    pub playback: PlaybackConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VrmotionError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, VrmotionError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, VrmotionError> {
        let paths = [
            PathBuf::from("vrmotion.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), VrmotionError> {
        if !self.avatar.scale.is_finite() || self.avatar.scale <= 0.0 {
            return Err(invalid("avatar.scale", "Scale must be a positive number"));
        }

        if self.avatar.position.iter().any(|c| !c.is_finite()) {
            return Err(invalid("avatar.position", "Position must be finite"));
        }

        if !self.animation.time_scale.is_finite() || self.animation.time_scale <= 0.0 {
            return Err(invalid(
                "animation.time_scale",
                "Time scale must be a positive number",
            ));
        }

        if self.playback.fps == 0 {
            return Err(invalid("playback.fps", "Frame rate must be greater than 0"));
        }

        if !self.playback.duration_secs.is_finite() || self.playback.duration_secs < 0.0 {
            return Err(invalid(
                "playback.duration_secs",
                "Duration must be a non-negative number",
            ));
        }

        if self.avatar.model_path.is_empty() {
            tracing::warn!("avatar.model_path is empty; the avatar will never load");
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> VrmotionError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Avatar model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Path to the VRM/GLB model file
    pub model_path: String,
    /// World position of the model root
    pub position: [f32; 3],
    /// Uniform scale of the model root
    pub scale: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            model_path: "assets/models/avatar.vrm".to_string(),
            position: [0.0, 0.0, 0.0],
            scale: 1.0,
        }
    }
}

/// Procedural animation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Mode active on startup
    pub initial_mode: AnimationMode,
    /// When mode switches reset the animation clock
    pub clock_policy: ClockPolicy,
    /// Zero all animated bones and expressions on every mode switch
    pub reset_pose_on_switch: bool,
    /// Multiplier applied to frame deltas
    pub time_scale: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            initial_mode: AnimationMode::Idle,
            clock_policy: ClockPolicy::Always,
            reset_pose_on_switch: false,
            time_scale: 1.0,
        }
    }
}

/// Headless playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Simulated frames per second
    pub fps: u32,
    /// Total playback length in seconds
    pub duration_secs: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            duration_secs: 5.0,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("vrmotion");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/vrmotion");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/vrmotion");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("vrmotion");
        }
    }

    PathBuf::from(".")
}
