//! Configuration file support for vidanno.
//!
//! This module provides serialization and deserialization of application settings:
//! logging, the default drawing kind and tracker, undo depth, and the global
//! style defaults that fill in unset annotation style fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vidanno_core::{AnnotationKind, AnnotationStyle, DetectOptions, StyleDefaults, UndoConfig};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

fn default_app_name() -> String {
    "vidanno".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Kind used by the drawing tool and by detectors
    #[serde(default)]
    pub annotation_kind: AnnotationKind,

    /// Tracker used to fill empty frames on navigation (none when unset)
    #[serde(default)]
    pub tracker: Option<String>,

    /// Label detections with `text_template`
    #[serde(default)]
    pub show_text: bool,

    /// Undo depth per frame (unbounded when unset)
    #[serde(default)]
    pub max_history: Option<usize>,

    /// Detector labels to keep (empty keeps all)
    #[serde(default)]
    pub keep_labels: Vec<String>,

    /// Label text for detections, e.g. `{score:.2f} {label}`
    #[serde(default)]
    pub text_template: Option<String>,

    /// Global style defaults
    #[serde(default)]
    pub style: StyleDefaults,
}

impl UserPreferences {
    pub fn undo_config(&self) -> UndoConfig {
        UndoConfig {
            max_history: self.max_history,
        }
    }

    /// Style stamped on newly drawn annotations: the configured color. Other
    /// fields keep following the global defaults.
    pub fn draw_style(&self) -> AnnotationStyle {
        AnnotationStyle {
            color: Some(self.style.color),
            ..Default::default()
        }
    }

    /// Detector options for the current kind, color and label settings.
    /// The text template only applies while `show_text` is on.
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            kind: self.annotation_kind,
            color: Some(self.style.color),
            keep_labels: self.keep_labels.clone(),
            text_template: self
                .text_template
                .clone()
                .filter(|_| self.show_text),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default config file name.
    pub fn default_filename() -> &'static str {
        "vidanno-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("vidanno").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("vidanno")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidanno_core::Argb;

    #[test]
    fn test_default_roundtrip() {
        let config = AppConfig::new();
        let json = config.to_json().unwrap();
        let back = AppConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{"version": {}}}"#, CONFIG_VERSION + 1);
        assert!(matches!(
            AppConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r##"{
            "version": 1,
            "preferences": {
                "log_level": "debug",
                "annotation_kind": "circle",
                "tracker": "copy",
                "style": { "color": "#ffff0000", "thickness": 0.01 }
            }
        }"##;
        let config = AppConfig::from_json(json).unwrap();
        let prefs = &config.preferences;
        assert_eq!(config.app_name, "vidanno");
        assert_eq!(prefs.log_level.to_level_filter(), log::LevelFilter::Debug);
        assert_eq!(prefs.annotation_kind, AnnotationKind::Circle);
        assert_eq!(prefs.tracker.as_deref(), Some("copy"));
        assert_eq!(prefs.style.color, Argb::rgb(255, 0, 0));
        assert_eq!(prefs.style.thickness, 0.01);
        assert_eq!(prefs.style.font_name, StyleDefaults::default().font_name);
        assert_eq!(prefs.max_history, None);
    }

    #[test]
    fn test_detect_options_follow_preferences() {
        let mut prefs = UserPreferences::default();
        prefs.annotation_kind = AnnotationKind::Text;
        prefs.keep_labels = vec!["1".to_string()];
        let options = prefs.detect_options();
        assert_eq!(options.kind, AnnotationKind::Text);
        assert_eq!(options.color, Some(prefs.style.color));
        assert_eq!(options.keep_labels, prefs.keep_labels);
    }

    #[test]
    fn test_draw_style_carries_color_only() {
        let mut prefs = UserPreferences::default();
        prefs.style.color = Argb::rgb(0, 0, 255);
        let style = prefs.draw_style();
        assert_eq!(style.color, Some(Argb::rgb(0, 0, 255)));
        assert_eq!(style.fill_color, None);
    }

    #[test]
    fn test_text_template_needs_show_text() {
        let mut prefs = UserPreferences {
            text_template: Some("{label}".to_string()),
            ..Default::default()
        };
        assert_eq!(prefs.detect_options().text_template, None);
        prefs.show_text = true;
        assert_eq!(prefs.detect_options().text_template.as_deref(), Some("{label}"));
    }

    #[test]
    fn test_save_and_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(AppConfig::default_filename());
        let mut config = AppConfig::new();
        config.preferences.max_history = Some(50);
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }
}
