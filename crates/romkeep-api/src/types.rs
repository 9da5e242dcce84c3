//! Shared types for library records and sessions

use romkeep_util::RomFile;
use serde::{Deserialize, Serialize};

/// A boolean that may be unknown.
///
/// On a write, `Unknown` means "leave the stored value alone".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    #[default]
    Unknown,
    False,
    True,
}

impl TriState {
    /// Database encoding: -1 unknown, 0 false, 1 true
    pub fn to_db(self) -> i64 {
        match self {
            TriState::Unknown => -1,
            TriState::False => 0,
            TriState::True => 1,
        }
    }

    /// Decode the database encoding; anything out of range is unknown
    pub fn from_db(value: i64) -> Self {
        match value {
            0 => TriState::False,
            1 => TriState::True,
            _ => TriState::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == TriState::True
    }

    pub fn is_known(self) -> bool {
        self != TriState::Unknown
    }

    /// `self` unless unknown, in which case `prior`
    pub fn or(self, prior: TriState) -> TriState {
        if self.is_known() { self } else { prior }
    }

    /// Unknown resolves to false
    pub fn resolved(self) -> TriState {
        self.or(TriState::False)
    }

    /// Flip a known value; unknown counts as false
    pub fn toggled(self) -> TriState {
        if self.is_true() {
            TriState::False
        } else {
            TriState::True
        }
    }
}

impl From<bool> for TriState {
    fn from(b: bool) -> Self {
        if b { TriState::True } else { TriState::False }
    }
}

/// Persisted per-game statistics, keyed by file path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomRecord {
    pub file: RomFile,
    pub name: String,
    /// Number of play sessions recorded
    pub count: i64,
    /// Cumulative seconds played
    pub time: i64,
    /// Duration of the most recent session, in seconds
    pub last_session_time: i64,
    /// Last played, `YYYYMMDD.HHMMSS`; empty if never played
    pub last: String,
    pub completed: TriState,
    pub favorite: TriState,
}

impl RomRecord {
    /// A fresh record for a file, named after its stem
    pub fn new(file: impl Into<RomFile>) -> Self {
        let file = file.into();
        let name = file.stem();
        Self {
            file,
            name,
            count: 0,
            time: 0,
            last_session_time: 0,
            last: String::new(),
            completed: TriState::Unknown,
            favorite: TriState::Unknown,
        }
    }

    /// A touch write that only changes the favorite flag
    pub fn favorite_touch(file: RomFile, favorite: bool) -> Self {
        Self {
            favorite: favorite.into(),
            ..Self::new(file)
        }
    }

    /// A touch write that only changes the completed flag
    pub fn completed_touch(file: RomFile, completed: bool) -> Self {
        Self {
            completed: completed.into(),
            ..Self::new(file)
        }
    }

    /// A measured play session of `seconds`
    pub fn session(file: RomFile, seconds: i64) -> Self {
        Self {
            time: seconds,
            ..Self::new(file)
        }
    }

    /// Whether this write only touches metadata
    pub fn is_touch(&self) -> bool {
        self.time == 0
    }
}

/// Current session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotRunning,
    Running,
    Suspended,
    Terminated,
}

impl SessionState {
    /// Whether a live process group backs this state
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Running | SessionState::Suspended)
    }
}

/// How a wait on a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The game exited on its own
    Exited { code: i32 },
    /// The game was terminated by a signal from outside; it stays resumable
    Killed { signal: i32 },
    /// The launcher could not execute the emulator
    LaunchFailed,
    /// The switch combo was pressed; the session is suspended
    SwitchRequested,
}

impl WaitOutcome {
    /// Whether the session should stay in the recovery set
    pub fn keeps_recovery_entry(self) -> bool {
        matches!(self, WaitOutcome::Killed { .. } | WaitOutcome::SwitchRequested)
    }
}
