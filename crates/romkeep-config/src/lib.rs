//! Configuration parsing and validation for romkeep
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Per-system launcher commands
//! - Session timing, accounting interval and switch-combo input
//! - Validation with clear error messages

mod config;
mod schema;
mod validation;

pub use config::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Like [`load_config`], but a missing file yields the defaults
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    if !path.exists() {
        info!(config_path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("config_version = 1").unwrap();
        assert_eq!(config.session.wait_poll, Duration::from_millis(100));
        assert_eq!(config.accounting.poll_interval, Duration::from_secs(5));
        assert!(config.systems.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            r#"
            config_version = 1

            [paths]
            data_dir = "/mnt/SDCARD/.romkeep"
            hotkey_marker = "/tmp/hotkeys.disabled"

            [systems.GBA]
            launcher = "/mnt/SDCARD/Emus/GBA/launch.sh"

            [session]
            grace_period_ms = 1500

            [accounting]
            poll_interval_secs = 2

            [input]
            gamepad = true
            combo = ["LeftTrigger", "RightTrigger"]
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.data_dir, PathBuf::from("/mnt/SDCARD/.romkeep"));
        assert_eq!(
            config.paths.recovery_file,
            PathBuf::from("/mnt/SDCARD/.romkeep/resume.txt")
        );
        assert_eq!(config.session.grace_period, Duration::from_millis(1500));
        assert_eq!(config.accounting.poll_interval, Duration::from_secs(2));
        assert!(config.input.gamepad);
        assert_eq!(config.input.combo, ["LeftTrigger", "RightTrigger"]);
        assert_eq!(
            config.systems["GBA"].launcher,
            PathBuf::from("/mnt/SDCARD/Emus/GBA/launch.sh")
        );
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let result = parse_config(
            r#"
            config_version = 1
            [accounting]
            poll_interval_secs = 0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.session.grace_period, Duration::from_secs(2));
    }

    #[test]
    fn present_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_version = 1\n[session]\nwait_poll_ms = 50\n").unwrap();
        let config = load_config_or_default(&path).unwrap();
        assert_eq!(config.session.wait_poll, Duration::from_millis(50));
    }
}
