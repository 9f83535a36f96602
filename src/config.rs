//! Persisted user preferences: default callout style, export multiplier,
//! and last-used directories. Annotations themselves are never persisted;
//! they only survive as pixels in the exported composite.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::export::DEFAULT_MULTIPLIER;
use crate::model::LabelStyle;

/// Bumped on breaking changes to the preferences format.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    /// Style applied to newly created callouts.
    #[serde(default)]
    pub default_style: LabelStyle,

    /// Resolution multiplier for composite export.
    #[serde(default = "default_multiplier")]
    pub export_multiplier: u32,

    #[serde(default)]
    pub last_open_dir: Option<PathBuf>,

    #[serde(default)]
    pub last_save_dir: Option<PathBuf>,
}

fn default_multiplier() -> u32 {
    DEFAULT_MULTIPLIER
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            default_style: LabelStyle::default(),
            export_multiplier: DEFAULT_MULTIPLIER,
            last_open_dir: None,
            last_save_dir: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse preferences: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("preferences version {file_version} is newer than supported version {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|dir| dir.join("callout").join("callout-config.json"))
    }

    /// Load preferences from the default path, falling back to defaults
    /// when the file is absent or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            log::debug!("no preferences file at {}", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("loaded preferences from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("ignoring preferences file {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("failed to read preferences {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save preferences to the default path, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine config directory",
            ))
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_json().map_err(ConfigError::ParseError)?)?;
        log::debug!("saved preferences to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut config = AppConfig::default();
        config.default_style.size = 42.0;
        config.export_multiplier = 5;
        config.last_open_dir = Some(PathBuf::from("/tmp/shots"));

        let json = config.to_json().unwrap();
        let back = AppConfig::from_json(&json).unwrap();
        assert_eq!(back.default_style.size, 42.0);
        assert_eq!(back.export_multiplier, 5);
        assert_eq!(back.last_open_dir, Some(PathBuf::from("/tmp/shots")));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let back = AppConfig::from_json(r#"{"version":1}"#).unwrap();
        assert_eq!(back.export_multiplier, DEFAULT_MULTIPLIER);
        assert_eq!(back.default_style, LabelStyle::default());
    }

    #[test]
    fn newer_version_is_rejected() {
        let err = AppConfig::from_json(r#"{"version":99}"#).unwrap_err();
        assert!(matches!(err, ConfigError::VersionTooNew { .. }));
    }
}
