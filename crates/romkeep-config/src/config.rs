//! Validated configuration structures

use crate::schema::RawConfig;
use romkeep_util::{default_data_dir, default_hotkey_marker, recovery_path};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SWITCH_COMBO: [&str; 2] = ["Select", "Start"];

/// Gamepad buttons a switch combo may use
pub const SWITCH_BUTTONS: &[&str] = &[
    "South",
    "East",
    "North",
    "West",
    "LeftTrigger",
    "LeftTrigger2",
    "RightTrigger",
    "RightTrigger2",
    "Select",
    "Start",
    "Mode",
    "LeftThumb",
    "RightThumb",
    "DPadUp",
    "DPadDown",
    "DPadLeft",
    "DPadRight",
];

const DEFAULT_LAUNCHERS_DIR: &str = "/mnt/SDCARD/Emus";
const FALLBACK_LAUNCHER_NAME: &str = "launch.sh";

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: PathsConfig,
    pub systems: BTreeMap<String, SystemConfig>,
    pub session: SessionConfig,
    pub accounting: AccountingConfig,
    pub input: InputConfig,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub recovery_file: PathBuf,
    pub hotkey_marker: PathBuf,
    pub launchers_dir: PathBuf,
    pub launcher_log: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub launcher: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub grace_period: Duration,
    pub wait_poll: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(2),
            wait_poll: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountingConfig {
    pub poll_interval: Duration,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Whether to watch gamepads for the switch combo
    pub gamepad: bool,
    pub combo: [String; 2],
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let session_defaults = SessionConfig::default();
        let accounting_defaults = AccountingConfig::default();

        let data_dir = raw.paths.data_dir.unwrap_or_else(default_data_dir);
        let recovery_file = raw
            .paths
            .recovery_file
            .unwrap_or_else(|| recovery_path(&data_dir));

        let combo = match raw.input.combo {
            Some(names) if names.len() == 2 => [names[0].clone(), names[1].clone()],
            _ => DEFAULT_SWITCH_COMBO.map(String::from),
        };

        Self {
            paths: PathsConfig {
                data_dir,
                recovery_file,
                hotkey_marker: raw.paths.hotkey_marker.unwrap_or_else(default_hotkey_marker),
                launchers_dir: raw
                    .paths
                    .launchers_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LAUNCHERS_DIR)),
                launcher_log: raw.paths.launcher_log,
            },
            systems: raw
                .systems
                .into_iter()
                .map(|(name, s)| (name, SystemConfig { launcher: s.launcher }))
                .collect(),
            session: SessionConfig {
                grace_period: raw
                    .session
                    .grace_period_ms
                    .map(Duration::from_millis)
                    .unwrap_or(session_defaults.grace_period),
                wait_poll: raw
                    .session
                    .wait_poll_ms
                    .map(Duration::from_millis)
                    .unwrap_or(session_defaults.wait_poll),
            },
            accounting: AccountingConfig {
                poll_interval: raw
                    .accounting
                    .poll_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(accounting_defaults.poll_interval),
            },
            input: InputConfig {
                gamepad: raw.input.gamepad.unwrap_or(true),
                combo,
            },
        }
    }

    /// Point the data directory elsewhere, moving a derived recovery file along
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        if self.paths.recovery_file == recovery_path(&self.paths.data_dir) {
            self.paths.recovery_file = recovery_path(&data_dir);
        }
        self.paths.data_dir = data_dir;
        self
    }

    /// Launcher for a system: the configured one, else an existing
    /// `<launchers_dir>/<system>/launch.sh`
    pub fn resolve_launcher(&self, system: &str) -> Option<PathBuf> {
        if let Some(configured) = self.systems.get(system) {
            return Some(configured.launcher.clone());
        }
        if system.is_empty() {
            return None;
        }

        let fallback = self
            .paths
            .launchers_dir
            .join(system)
            .join(FALLBACK_LAUNCHER_NAME);
        fallback.is_file().then_some(fallback)
    }

    pub fn db_path(&self) -> PathBuf {
        romkeep_util::db_path(&self.paths.data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.paths.data_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            ..Default::default()
        })
    }
}
