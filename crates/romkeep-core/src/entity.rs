//! Runtime game entity

use romkeep_api::{RomRecord, TriState};
use romkeep_config::Config;
use romkeep_util::{RomFile, format_seconds};
use serde::Serialize;

/// Process id of an entity with no live session
pub const NO_PID: i32 = -1;

const IMAGE_DIR: &str = "Imgs";
const VIDEO_DIR: &str = "Videos";
const MANUAL_DIR: &str = "Manuals";

/// A library record plus the fields derived from it and the runtime
/// process ids of its session, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RomEntity {
    pub file: RomFile,
    pub name: String,
    pub count: i64,
    pub time: i64,
    pub last_session_time: i64,
    pub last: String,
    pub completed: TriState,
    pub favorite: TriState,

    /// `time` formatted for display
    pub total_time: String,
    /// `time / count` formatted for display; "0s" before the first session
    pub average_time: String,
    pub system: String,
    /// Asset paths; empty when the file does not exist
    pub image: String,
    pub video: String,
    pub manual: String,
    /// Launcher script; empty when none is configured or installed
    pub launcher: String,

    pub pid: i32,
    pub process_group_id: i32,
}

impl RomEntity {
    pub fn from_record(record: RomRecord, config: &Config) -> Self {
        let system = record.file.system();
        let average = if record.count > 0 {
            record.time / record.count
        } else {
            0
        };
        let launcher = config
            .resolve_launcher(&system)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            total_time: format_seconds(record.time),
            average_time: format_seconds(average),
            image: asset_path(&record.file, IMAGE_DIR, "png"),
            video: asset_path(&record.file, VIDEO_DIR, "mp4"),
            manual: asset_path(&record.file, MANUAL_DIR, "pdf"),
            system,
            launcher,
            file: record.file,
            name: record.name,
            count: record.count,
            time: record.time,
            last_session_time: record.last_session_time,
            last: record.last,
            completed: record.completed.resolved(),
            favorite: record.favorite.resolved(),
            pid: NO_PID,
            process_group_id: NO_PID,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pid != NO_PID
    }

    pub fn clear_runtime(&mut self) {
        self.pid = NO_PID;
        self.process_group_id = NO_PID;
    }
}

/// `<rom dir>/<dir>/<stem>.<ext>` if it exists
fn asset_path(file: &RomFile, dir: &str, ext: &str) -> String {
    let Some(rom_dir) = file.as_path().parent() else {
        return String::new();
    };
    let candidate = rom_dir.join(dir).join(format!("{}.{}", file.stem(), ext));
    if candidate.is_file() {
        candidate.to_string_lossy().into_owned()
    } else {
        String::new()
    }
}
