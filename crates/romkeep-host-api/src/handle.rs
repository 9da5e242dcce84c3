//! Process handle abstraction

use serde::{Deserialize, Serialize};

/// Handle to a launched process group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessHandle {
    /// Process ID of the group leader
    pub pid: i32,

    /// Process group ID (equal to `pid` for a session leader)
    pub pgid: i32,
}

impl ProcessHandle {
    pub fn new(pid: i32, pgid: i32) -> Self {
        Self { pid, pgid }
    }

    /// A handle that can be signalled
    pub fn is_valid(&self) -> bool {
        self.pid > 0 && self.pgid > 0
    }
}

/// Exit status of a reaped group leader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,

    /// Whether the process was signaled
    pub signaled: bool,

    /// Signal number if signaled
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            signaled: false,
            signal: None,
        }
    }

    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signaled: false,
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signaled: true,
            signal: Some(signal),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}
