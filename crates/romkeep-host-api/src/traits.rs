//! Host process traits

use romkeep_util::RomFile;
use std::path::Path;
use thiserror::Error;

use crate::{ExitStatus, ProcessHandle};

/// Errors from host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Signal failed: {0}")]
    SignalFailed(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Signals the session manager sends to a process group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Suspend (SIGSTOP)
    Stop,
    /// Resume (SIGCONT)
    Cont,
    /// Ask to terminate (SIGTERM)
    Term,
}

/// Scheduler state of a process as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Runnable or sleeping: time counts as played
    Running,
    /// Stopped by a signal: suspended, time does not count
    Stopped,
    /// Exited, zombie, or no such process
    Gone,
}

/// Options passed to the launcher process
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Extra environment variables for the launcher
    pub env: Vec<(String, String)>,

    /// Log file for the launcher's stdout/stderr; discarded if unset
    pub log_path: Option<std::path::PathBuf>,
}

/// Host process operations
pub trait ProcessHost: Send + Sync {
    /// Run `launcher <file>` as the leader of a new session and process group
    fn spawn(
        &self,
        launcher: &Path,
        file: &RomFile,
        options: &SpawnOptions,
    ) -> HostResult<ProcessHandle>;

    /// Signal a whole process group.
    ///
    /// Non-positive or stale group ids are a successful no-op.
    fn signal_group(&self, pgid: i32, kind: SignalKind) -> HostResult<()>;

    /// Reap the group leader if it has exited (non-blocking)
    fn try_wait(&self, handle: &ProcessHandle) -> HostResult<Option<ExitStatus>>;

    /// Scheduler state of any process, launched by us or not
    fn poll_state(&self, pid: i32) -> ProcessState;
}

/// Source of the "switch session" button combination
pub trait SwitchCombo {
    /// Non-blocking: whether the combo is currently held
    fn pressed(&mut self) -> bool;
}

/// A combo that is never pressed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCombo;

impl SwitchCombo for NoCombo {
    fn pressed(&mut self) -> bool {
        false
    }
}
