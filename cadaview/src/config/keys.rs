//! Configuration key access and validation.
//!
//! This module provides a type-safe interface for getting and setting
//! the scalar configuration values by `section.key` name. Repeated sections
//! (`[layer.*]`, `[overlay.*]`, ...) are edited in the file directly.

use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::defaults::MAX_PRECISION;
use super::file::ConfigFile;
use super::parser::{expand_tilde, optional_string, parse_bool_str};
use crate::coord::MAX_ZOOM;
use crate::popup::NumberLocale;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
///
/// Each key maps to a specific field in [`ConfigFile`] and knows how to
/// get and set its value with proper validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    // Map settings
    MapCenterLat,
    MapCenterLon,
    MapZoom,
    MapMinZoom,
    MapMaxZoom,

    // Loader settings
    LoaderCacheBuster,
    LoaderTimeout,
    LoaderBaseUrl,

    // Popup settings
    PopupMaxWidth,
    PopupClassName,
    PopupLocale,

    // Search settings
    SearchIdentifierAttribute,

    // Process settings
    ProcessRawDir,
    ProcessProcessedDir,
    ProcessBackupDir,
    ProcessSimplifyTolerance,
    ProcessPrecision,
    ProcessKeepBackups,
    ProcessAttributesToKeep,

    // Logging settings
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == lowered)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Get the canonical key name (e.g., "map.center_lat").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::MapCenterLat => "map.center_lat",
            ConfigKey::MapCenterLon => "map.center_lon",
            ConfigKey::MapZoom => "map.zoom",
            ConfigKey::MapMinZoom => "map.min_zoom",
            ConfigKey::MapMaxZoom => "map.max_zoom",
            ConfigKey::LoaderCacheBuster => "loader.cache_buster",
            ConfigKey::LoaderTimeout => "loader.timeout",
            ConfigKey::LoaderBaseUrl => "loader.base_url",
            ConfigKey::PopupMaxWidth => "popup.max_width",
            ConfigKey::PopupClassName => "popup.class_name",
            ConfigKey::PopupLocale => "popup.locale",
            ConfigKey::SearchIdentifierAttribute => "search.identifier_attribute",
            ConfigKey::ProcessRawDir => "process.raw_dir",
            ConfigKey::ProcessProcessedDir => "process.processed_dir",
            ConfigKey::ProcessBackupDir => "process.backup_dir",
            ConfigKey::ProcessSimplifyTolerance => "process.simplify_tolerance",
            ConfigKey::ProcessPrecision => "process.precision",
            ConfigKey::ProcessKeepBackups => "process.keep_backups",
            ConfigKey::ProcessAttributesToKeep => "process.attributes_to_keep",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Get the section name (e.g., "map").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Get the key name within the section (e.g., "center_lat").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::MapCenterLat => config.map.center_lat.to_string(),
            ConfigKey::MapCenterLon => config.map.center_lon.to_string(),
            ConfigKey::MapZoom => config.map.zoom.to_string(),
            ConfigKey::MapMinZoom => config.map.min_zoom.to_string(),
            ConfigKey::MapMaxZoom => config.map.max_zoom.to_string(),
            ConfigKey::LoaderCacheBuster => config.loader.cache_buster.to_string(),
            ConfigKey::LoaderTimeout => config.loader.timeout.to_string(),
            ConfigKey::LoaderBaseUrl => config.loader.base_url.clone().unwrap_or_default(),
            ConfigKey::PopupMaxWidth => config.popup.max_width.to_string(),
            ConfigKey::PopupClassName => config.popup.class_name.clone(),
            ConfigKey::PopupLocale => config.popup.locale.to_string(),
            ConfigKey::SearchIdentifierAttribute => config.search.identifier_attribute.clone(),
            ConfigKey::ProcessRawDir => path_to_display(&config.process.raw_dir),
            ConfigKey::ProcessProcessedDir => path_to_display(&config.process.processed_dir),
            ConfigKey::ProcessBackupDir => path_to_display(&config.process.backup_dir),
            ConfigKey::ProcessSimplifyTolerance => config.process.simplify_tolerance.to_string(),
            ConfigKey::ProcessPrecision => config.process.precision.to_string(),
            ConfigKey::ProcessKeepBackups => config.process.keep_backups.to_string(),
            ConfigKey::ProcessAttributesToKeep => config.process.attributes_to_keep.join(", "),
            ConfigKey::LoggingFile => path_to_display(&config.logging.file),
        }
    }

    /// Set the value in a config file.
    ///
    /// The value is parsed and validated before anything is written, so an
    /// invalid value leaves the config unchanged.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        let value = value.trim();
        match self {
            ConfigKey::MapCenterLat => {
                config.map.center_lat = self.parse_ranged(value, -90.0, 90.0)?;
            }
            ConfigKey::MapCenterLon => {
                config.map.center_lon = self.parse_ranged(value, -180.0, 180.0)?;
            }
            ConfigKey::MapZoom => {
                let zoom = self.parse_zoom(value)?;
                if zoom < config.map.min_zoom || zoom > config.map.max_zoom {
                    return Err(self.invalid(format!(
                        "must lie between map.min_zoom ({}) and map.max_zoom ({})",
                        config.map.min_zoom, config.map.max_zoom
                    )));
                }
                config.map.zoom = zoom;
            }
            ConfigKey::MapMinZoom => {
                let zoom = self.parse_zoom(value)?;
                if zoom > config.map.max_zoom {
                    return Err(self.invalid(format!(
                        "must not exceed map.max_zoom ({})",
                        config.map.max_zoom
                    )));
                }
                config.map.min_zoom = zoom;
            }
            ConfigKey::MapMaxZoom => {
                let zoom = self.parse_zoom(value)?;
                if zoom < config.map.min_zoom {
                    return Err(self.invalid(format!(
                        "must not be below map.min_zoom ({})",
                        config.map.min_zoom
                    )));
                }
                config.map.max_zoom = zoom;
            }
            ConfigKey::LoaderCacheBuster => {
                config.loader.cache_buster = self.parse_bool(value)?;
            }
            ConfigKey::LoaderTimeout => {
                config.loader.timeout = self.parse_positive(value)?;
            }
            ConfigKey::LoaderBaseUrl => {
                if !value.is_empty()
                    && !value.starts_with("http://")
                    && !value.starts_with("https://")
                {
                    return Err(self.invalid("must be an http:// or https:// URL or empty"));
                }
                config.loader.base_url = optional_string(value);
            }
            ConfigKey::PopupMaxWidth => {
                config.popup.max_width = self.parse_positive(value)?;
            }
            ConfigKey::PopupClassName => {
                if value.is_empty() {
                    return Err(self.invalid("must not be empty"));
                }
                config.popup.class_name = value.to_string();
            }
            ConfigKey::PopupLocale => {
                config.popup.locale = value
                    .parse::<NumberLocale>()
                    .map_err(|_| self.invalid("must be one of: fr, en, de"))?;
            }
            ConfigKey::SearchIdentifierAttribute => {
                if value.is_empty() {
                    return Err(self.invalid("must not be empty"));
                }
                config.search.identifier_attribute = value.to_string();
            }
            ConfigKey::ProcessRawDir => {
                config.process.raw_dir = self.parse_path(value)?;
            }
            ConfigKey::ProcessProcessedDir => {
                config.process.processed_dir = self.parse_path(value)?;
            }
            ConfigKey::ProcessBackupDir => {
                config.process.backup_dir = self.parse_path(value)?;
            }
            ConfigKey::ProcessSimplifyTolerance => {
                config.process.simplify_tolerance = self.parse_ranged(value, 0.0, f64::MAX)?;
            }
            ConfigKey::ProcessPrecision => {
                let precision: u32 = value
                    .parse()
                    .map_err(|_| self.invalid("must be an integer between 0 and 15"))?;
                if precision > MAX_PRECISION {
                    return Err(self.invalid("must be an integer between 0 and 15"));
                }
                config.process.precision = precision;
            }
            ConfigKey::ProcessKeepBackups => {
                config.process.keep_backups = self.parse_positive(value)?;
            }
            ConfigKey::ProcessAttributesToKeep => {
                config.process.attributes_to_keep = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ConfigKey::LoggingFile => {
                config.logging.file = self.parse_path(value)?;
            }
        }
        Ok(())
    }

    /// Get all supported keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::MapCenterLat,
            ConfigKey::MapCenterLon,
            ConfigKey::MapZoom,
            ConfigKey::MapMinZoom,
            ConfigKey::MapMaxZoom,
            ConfigKey::LoaderCacheBuster,
            ConfigKey::LoaderTimeout,
            ConfigKey::LoaderBaseUrl,
            ConfigKey::PopupMaxWidth,
            ConfigKey::PopupClassName,
            ConfigKey::PopupLocale,
            ConfigKey::SearchIdentifierAttribute,
            ConfigKey::ProcessRawDir,
            ConfigKey::ProcessProcessedDir,
            ConfigKey::ProcessBackupDir,
            ConfigKey::ProcessSimplifyTolerance,
            ConfigKey::ProcessPrecision,
            ConfigKey::ProcessKeepBackups,
            ConfigKey::ProcessAttributesToKeep,
            ConfigKey::LoggingFile,
        ]
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigKeyError {
        ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason: reason.into(),
        }
    }

    fn parse_ranged(&self, value: &str, min: f64, max: f64) -> Result<f64, ConfigKeyError> {
        let reason = || {
            if max == f64::MAX {
                format!("must be a number >= {}", min)
            } else {
                format!("must be a number between {} and {}", min, max)
            }
        };
        let n: f64 = value.parse().map_err(|_| self.invalid(reason()))?;
        if !n.is_finite() || n < min || n > max {
            return Err(self.invalid(reason()));
        }
        Ok(n)
    }

    fn parse_zoom(&self, value: &str) -> Result<u8, ConfigKeyError> {
        let reason = format!("must be an integer between 0 and {}", MAX_ZOOM);
        let zoom: u8 = value.parse().map_err(|_| self.invalid(reason.clone()))?;
        if zoom > MAX_ZOOM {
            return Err(self.invalid(reason));
        }
        Ok(zoom)
    }

    fn parse_positive<T: FromStr + Default + PartialOrd>(
        &self,
        value: &str,
    ) -> Result<T, ConfigKeyError> {
        let n: T = value
            .parse()
            .map_err(|_| self.invalid("must be a positive integer"))?;
        if n <= T::default() {
            return Err(self.invalid("must be a positive integer"));
        }
        Ok(n)
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigKeyError> {
        parse_bool_str(value).ok_or_else(|| self.invalid("must be true or false"))
    }

    fn parse_path(&self, value: &str) -> Result<std::path::PathBuf, ConfigKeyError> {
        if value.is_empty() {
            return Err(self.invalid("must not be empty"));
        }
        Ok(expand_tilde(value))
    }
}

/// Display a path with the home directory collapsed to ~.
fn path_to_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_ZOOM;

    #[test]
    fn test_config_key_parsing() {
        assert_eq!(
            "map.center_lat".parse::<ConfigKey>().unwrap(),
            ConfigKey::MapCenterLat
        );
        // Case insensitive
        assert_eq!(
            "SEARCH.IDENTIFIER_ATTRIBUTE".parse::<ConfigKey>().unwrap(),
            ConfigKey::SearchIdentifierAttribute
        );
        assert!("invalid.key".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_key_name_parts() {
        assert_eq!(ConfigKey::PopupLocale.section(), "popup");
        assert_eq!(ConfigKey::PopupLocale.key_name(), "locale");
        assert_eq!(ConfigKey::ProcessKeepBackups.section(), "process");
        assert_eq!(ConfigKey::ProcessKeepBackups.key_name(), "keep_backups");
    }

    #[test]
    fn test_get_value() {
        let config = ConfigFile::default();

        assert_eq!(ConfigKey::LoaderTimeout.get(&config), "30");
        assert_eq!(ConfigKey::LoaderCacheBuster.get(&config), "true");
        assert_eq!(ConfigKey::PopupLocale.get(&config), "fr");
        assert_eq!(ConfigKey::LoaderBaseUrl.get(&config), "");
    }

    #[test]
    fn test_set_value() {
        let mut config = ConfigFile::default();

        ConfigKey::MapCenterLat.set(&mut config, "14.6415").unwrap();
        assert_eq!(config.map.center_lat, 14.6415);

        ConfigKey::LoaderCacheBuster.set(&mut config, "off").unwrap();
        assert!(!config.loader.cache_buster);

        ConfigKey::ProcessAttributesToKeep
            .set(&mut config, "num_lot, surface")
            .unwrap();
        assert_eq!(config.process.attributes_to_keep, vec!["num_lot", "surface"]);
    }

    #[test]
    fn test_set_invalid_value_leaves_config_unchanged() {
        let mut config = ConfigFile::default();

        assert!(ConfigKey::MapCenterLat.set(&mut config, "91").is_err());
        assert!(ConfigKey::LoaderTimeout.set(&mut config, "0").is_err());
        assert!(ConfigKey::PopupLocale.set(&mut config, "xx").is_err());
        assert!(ConfigKey::MapZoom.set(&mut config, "31").is_err());
        assert!(ConfigKey::LoaderBaseUrl.set(&mut config, "not-a-url").is_err());

        let default = ConfigFile::default();
        assert_eq!(config.map, default.map);
        assert_eq!(config.loader, default.loader);
        assert_eq!(config.popup, default.popup);
    }

    #[test]
    fn test_min_zoom_cannot_exceed_max_zoom() {
        let mut config = ConfigFile::default();
        let result = ConfigKey::MapMinZoom.set(&mut config, "25");
        assert!(matches!(result, Err(ConfigKeyError::ValidationFailed { .. })));
    }

    #[test]
    fn test_zoom_must_stay_within_zoom_range() {
        let mut config = ConfigFile::default();
        let result = ConfigKey::MapZoom.set(&mut config, "22");
        assert!(matches!(result, Err(ConfigKeyError::ValidationFailed { .. })));
        assert_eq!(config.map.zoom, DEFAULT_ZOOM);

        ConfigKey::MapZoom.set(&mut config, "12").unwrap();
        assert_eq!(config.map.zoom, 12);
    }

    #[test]
    fn test_precision_capped() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::ProcessPrecision.set(&mut config, "400").is_err());
        ConfigKey::ProcessPrecision.set(&mut config, "15").unwrap();
        assert_eq!(config.process.precision, 15);
    }

    #[test]
    fn test_clear_optional_value() {
        let mut config = ConfigFile::default();

        ConfigKey::LoaderBaseUrl
            .set(&mut config, "https://example.com/data/")
            .unwrap();
        assert!(config.loader.base_url.is_some());

        ConfigKey::LoaderBaseUrl.set(&mut config, "").unwrap();
        assert!(config.loader.base_url.is_none());
    }

    #[test]
    fn test_all_keys_round_trip_names() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }
}
