use crate::error::AppError;
use image_picker::{DebugLevel, PickerConfig, PickerSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "gallery.toml";

/// User-tunable settings, read from `gallery.toml` in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Downscale bounds for picked images
    pub max_width: u32,
    pub max_height: u32,
    pub best_fit: bool,
    /// Offer camera apps in the picker
    pub show_camera: bool,
    /// Subdirectory the facility caches picked files in
    pub sub_directory: String,
    pub debug_level: DebugLevel,
    /// Clear the received queue after importing it
    pub remove_received: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_width: 1600,
            max_height: 1600,
            best_fit: true,
            show_camera: true,
            sub_directory: "Gallery".to_string(),
            debug_level: DebugLevel::Verbose,
            remove_received: true,
        }
    }
}

impl AppConfig {
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let config: AppConfig = toml::from_str(text)?;
        if config.max_width == 0 || config.max_height == 0 {
            return Err(AppError::Config(
                "max_width and max_height must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    /// Reads the config from `dir`, falling back to defaults
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {:?}, using defaults", path);
                return Self::default();
            }
            Err(e) => {
                log::warn!("Could not read {:?}: {}", path, e);
                return Self::default();
            }
        };

        match Self::parse(&text) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Ignoring {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn picker_settings(&self) -> PickerSettings {
        PickerSettings {
            sub_directory: Some(self.sub_directory.clone()),
            max_width: self.max_width,
            max_height: self.max_height,
            best_fit: self.best_fit,
            allow_capture: self.show_camera,
            use_default_picker: true,
            ..Default::default()
        }
    }

    /// App log level, following the picker's verbosity
    pub fn log_level(&self) -> log::LevelFilter {
        self.debug_level.level_filter()
    }

    pub fn picker_config(&self) -> PickerConfig {
        PickerConfig {
            debug_level: self.debug_level,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = AppConfig::parse("max_width = 800\ndebug_level = \"errors\"\n").unwrap();
        assert_eq!(config.max_width, 800);
        assert_eq!(config.max_height, 1600);
        assert_eq!(config.debug_level, DebugLevel::Errors);
        assert_eq!(config.sub_directory, "Gallery");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            AppConfig::parse("max_width = \"wide\""),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            AppConfig::parse("max_height = 0"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(AppConfig::load(dir.path()), AppConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "best_fit = [").unwrap();
        assert_eq!(AppConfig::load(dir.path()), AppConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "show_camera = false").unwrap();
        assert!(!AppConfig::load(dir.path()).show_camera);
    }

    #[test]
    fn test_picker_settings_projection() {
        let settings = AppConfig::default().picker_settings();
        assert_eq!(settings.max_width, 1600);
        assert!(settings.allow_capture);
        assert_eq!(settings.sub_directory.as_deref(), Some("Gallery"));
    }

    #[test]
    fn test_log_level_follows_debug_level() {
        assert_eq!(AppConfig::default().log_level(), log::LevelFilter::Debug);
        let quiet = AppConfig::parse("debug_level = \"silent\"").unwrap();
        assert_eq!(quiet.log_level(), log::LevelFilter::Off);
        let warnings = AppConfig::parse("debug_level = \"warnings\"").unwrap();
        assert_eq!(warnings.log_level(), log::LevelFilter::Warn);
    }
}
