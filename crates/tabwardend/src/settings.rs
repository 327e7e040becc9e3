//! Service settings
//!
//! A small TOML file for the things the daemon cannot learn from the
//! store: where to listen, where to keep data, how often to tick. A
//! missing file is not an error; every field has a default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tabwarden_util::{default_data_dir, default_socket_path};
use thiserror::Error;
use tracing::info;

/// Bounds for the enforcement tick interval.
const TICK_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("tick_interval_secs must be within 1..=300, got {0}")]
    InvalidTickInterval(u64),
}

/// Daemon service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Unix socket the display layer connects to
    pub socket_path: PathBuf,

    /// Directory holding the state database
    pub data_dir: PathBuf,

    /// Enforcement tick interval in seconds. Bounds the worst-case
    /// latency of budget enforcement and cooldown-expiry detection.
    pub tick_interval_secs: u64,

    /// Default log filter when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
            tick_interval_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

/// Load settings, falling back to defaults when the file does not exist.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();

    if !path.exists() {
        info!(path = %path.display(), "No settings file, using defaults");
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Parse and validate settings from a TOML string.
pub fn parse_settings(content: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = toml::from_str(content)?;

    if !TICK_INTERVAL_RANGE.contains(&settings.tick_interval_secs) {
        return Err(SettingsError::InvalidTickInterval(
            settings.tick_interval_secs,
        ));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.tick_interval_secs, 5);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn parse_partial_settings() {
        let settings = parse_settings(
            r#"
            tick_interval_secs = 10
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(settings.tick_interval_secs, 10);
        assert_eq!(settings.log_level, "debug");
        // Unspecified fields keep their defaults
        assert_eq!(settings.socket_path, Settings::default().socket_path);
    }

    #[test]
    fn reject_zero_tick_interval() {
        let result = parse_settings("tick_interval_secs = 0");
        assert!(matches!(
            result,
            Err(SettingsError::InvalidTickInterval(0))
        ));
    }

    #[test]
    fn reject_unknown_fields() {
        let result = parse_settings("no_such_setting = true");
        assert!(matches!(result, Err(SettingsError::ParseError(_))));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings("/nonexistent/tabwardend/config.toml").unwrap();
        assert_eq!(settings.tick_interval_secs, 5);
    }
}
