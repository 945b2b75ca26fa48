//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{MontageError, MontageResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Playback and duration policy.
    pub playback: PlaybackDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Playback policy and render loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Slot length given to an image when no duration was requested.
    pub default_image_duration_secs: f64,

    /// Hard floor for image slot length.
    pub min_image_duration_secs: f64,

    /// Shortest playable slot for a video clip.
    pub min_video_duration_secs: f64,

    /// Upper bound on render loop draws per second.
    pub frame_rate_hz: u32,

    /// Pointer idle time after which transport controls hide.
    pub controls_idle_timeout_secs: f64,

    /// Source/clock drift above which a playing source is re-positioned.
    pub resync_threshold_ms: f64,

    /// How frames are scaled onto the surface.
    pub fit_mode: FitMode,
}

/// Frame scaling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Fill the whole surface, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Preserve aspect ratio and letterbox.
    Contain,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            default_image_duration_secs: 5.0,
            min_image_duration_secs: 5.0,
            min_video_duration_secs: 1.0,
            frame_rate_hz: 60,
            controls_idle_timeout_secs: 3.0,
            resync_threshold_ms: 100.0,
            fit_mode: FitMode::Stretch,
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

impl PlaybackDefaults {
    /// Reject values the sequencer cannot work with.
    pub fn validate(&self) -> MontageResult<()> {
        let positive = [
            ("default_image_duration_secs", self.default_image_duration_secs),
            ("min_image_duration_secs", self.min_image_duration_secs),
            ("min_video_duration_secs", self.min_video_duration_secs),
            ("controls_idle_timeout_secs", self.controls_idle_timeout_secs),
            ("resync_threshold_ms", self.resync_threshold_ms),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(MontageError::config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.frame_rate_hz == 0 {
            return Err(MontageError::config("frame_rate_hz must be at least 1"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from a specific file, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.playback.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!("Ignoring invalid config at {:?}: {}", config_path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> MontageResult<()> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("montage").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.playback.validate().is_ok());
        assert_eq!(config.playback.min_image_duration_secs, 5.0);
        assert_eq!(config.playback.fit_mode, FitMode::Stretch);
    }

    #[test]
    fn test_validate_rejects_zero_frame_rate() {
        let playback = PlaybackDefaults {
            frame_rate_hz: 0,
            ..PlaybackDefaults::default()
        };
        assert!(matches!(
            playback.validate(),
            Err(MontageError::Config { .. })
        ));
    }

    #[test]
    fn test_partial_json_falls_back_to_field_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"playback": {"min_image_duration_secs": 2.0}}"#).unwrap();
        assert_eq!(config.playback.min_image_duration_secs, 2.0);
        assert_eq!(config.playback.frame_rate_hz, 60);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_logging_block_keeps_other_fields() {
        let config: AppConfig =
            serde_json::from_str(r#"{"logging": {"level": "debug"}}"#).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_from_invalid_file_uses_defaults() {
        let path = std::env::temp_dir().join("montage_test_invalid_config.json");
        std::fs::write(&path, r#"{"playback": {"frame_rate_hz": 0}}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.playback.frame_rate_hz, 60);

        std::fs::remove_file(&path).ok();
    }
}
