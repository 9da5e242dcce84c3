//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub paths: RawPaths,

    /// Launchers keyed by system (the ROM's parent directory name)
    #[serde(default)]
    pub systems: BTreeMap<String, RawSystem>,

    #[serde(default)]
    pub session: RawSession,

    #[serde(default)]
    pub accounting: RawAccounting,

    #[serde(default)]
    pub input: RawInput,
}

/// Filesystem locations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPaths {
    /// Directory for the database and recovery file
    pub data_dir: Option<PathBuf>,

    /// Recovery file (default: `<data_dir>/resume.txt`)
    pub recovery_file: Option<PathBuf>,

    /// Marker whose presence disables the host UI's hotkeys
    pub hotkey_marker: Option<PathBuf>,

    /// Fallback launchers live at `<launchers_dir>/<SYSTEM>/launch.sh`
    pub launchers_dir: Option<PathBuf>,

    /// File collecting launcher stdout/stderr
    pub launcher_log: Option<PathBuf>,
}

/// Per-system settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSystem {
    pub launcher: PathBuf,
}

/// Session timing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSession {
    /// Time a resumed game gets to initialise before it is suspended
    pub grace_period_ms: Option<u64>,

    /// Poll interval while waiting on the foreground game
    pub wait_poll_ms: Option<u64>,
}

/// Playtime accounting
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAccounting {
    pub poll_interval_secs: Option<u64>,
}

/// Switch-combo input
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawInput {
    /// Watch connected gamepads (default: true)
    pub gamepad: Option<bool>,

    /// Two button names that must be held together
    pub combo: Option<Vec<String>>,
}
