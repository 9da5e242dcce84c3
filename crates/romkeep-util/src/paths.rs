//! Default paths for romkeep components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$ROMKEEP_CONFIG` or `$XDG_CONFIG_HOME/romkeep/config.toml`
//! - Data: `$XDG_DATA_HOME/romkeep` or `~/.local/share/romkeep`
//! - Runtime markers: `$XDG_RUNTIME_DIR/romkeep` or `/tmp/romkeep-$USER`

use std::path::{Path, PathBuf};

/// Environment variable for overriding the config file path
pub const ROMKEEP_CONFIG_ENV: &str = "ROMKEEP_CONFIG";

/// Environment variable for overriding the data directory
pub const ROMKEEP_DATA_DIR_ENV: &str = "ROMKEEP_DATA_DIR";

/// Environment variable carrying the ROM path into a launcher
pub const ROMKEEP_FILE_ENV: &str = "ROMKEEP_FILE";

/// Application subdirectory name
const APP_DIR: &str = "romkeep";

const DB_FILENAME: &str = "romkeep.db";
const RECOVERY_FILENAME: &str = "resume.txt";
const HOTKEY_MARKER_FILENAME: &str = "hotkeys.disabled";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$ROMKEEP_CONFIG` environment variable (if set)
/// 2. `<config dir>/romkeep/config.toml`
/// 3. `/etc/romkeep/config.toml` when no config dir is known
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ROMKEEP_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/etc").join(APP_DIR).join("config.toml"))
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$ROMKEEP_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/romkeep` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/romkeep` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(ROMKEEP_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking ROMKEEP_DATA_DIR.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the runtime directory for volatile markers.
pub fn default_runtime_dir() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username))
}

/// Database file inside a data directory
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILENAME)
}

/// Recovery file inside a data directory.
///
/// Lives next to the database so it survives power loss.
pub fn recovery_path(data_dir: &Path) -> PathBuf {
    data_dir.join(RECOVERY_FILENAME)
}

/// Default location of the input-hotkey suppression marker
pub fn default_hotkey_marker() -> PathBuf {
    default_runtime_dir().join(HOTKEY_MARKER_FILENAME)
}
