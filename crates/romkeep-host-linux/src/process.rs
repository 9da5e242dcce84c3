//! Process management utilities

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use romkeep_host_api::{ExitStatus, HostError, HostResult, SignalKind, SpawnOptions};
use std::fs::OpenOptions;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// Exit status a shell uses when it cannot execute a command
pub const EXEC_FAILED_STATUS: i32 = 127;

/// Launched child process leading its own process group
pub struct ManagedProcess {
    pub child: Child,
    pub pid: i32,
    pub pgid: i32,
}

impl ManagedProcess {
    /// Spawn `program args..` in a new session, making it a group leader
    pub fn spawn(program: &Path, args: &[&str], options: &SpawnOptions) -> HostResult<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args);

        for (k, v) in &options.env {
            cmd.env(k, v);
        }

        match &options.log_path {
            Some(path) => {
                let log = OpenOptions::new().create(true).append(true).open(path)?;
                cmd.stdout(Stdio::from(log.try_clone()?));
                cmd.stderr(Stdio::from(log));
            }
            None => {
                cmd.stdout(Stdio::null());
                cmd.stderr(Stdio::null());
            }
        }

        cmd.stdin(Stdio::null());

        // SAFETY: setsid is async-signal-safe and touches no parent state
        unsafe {
            cmd.pre_exec(|| {
                // New session, and with it a new process group led by the child
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|e| {
            HostError::SpawnFailed(format!("Failed to spawn {}: {}", program.display(), e))
        })?;

        let pid = child.id() as i32;
        let pgid = pid; // After setsid, pid == pgid

        debug!(pid, pgid, program = %program.display(), "Process spawned");

        Ok(Self { child, pid, pgid })
    }

    /// Check if the leader has exited (non-blocking)
    pub fn try_wait(&mut self) -> HostResult<Option<ExitStatus>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(Some(convert_status(status))),
            Ok(None) => Ok(None),
            Err(e) => Err(HostError::Internal(format!("Wait failed: {}", e))),
        }
    }
}

fn convert_status(status: std::process::ExitStatus) -> ExitStatus {
    if let Some(code) = status.code() {
        ExitStatus::with_code(code)
    } else if let Some(sig) = status.signal() {
        ExitStatus::signaled(sig)
    } else {
        ExitStatus::with_code(-1)
    }
}

fn to_signal(kind: SignalKind) -> Signal {
    match kind {
        SignalKind::Stop => Signal::SIGSTOP,
        SignalKind::Cont => Signal::SIGCONT,
        SignalKind::Term => Signal::SIGTERM,
    }
}

/// Send a signal to a whole process group.
///
/// Non-positive group ids are never signalled, and a group that no longer
/// exists is not an error.
pub fn signal_group(pgid: i32, kind: SignalKind) -> HostResult<()> {
    if pgid <= 0 {
        debug!(pgid, ?kind, "Ignoring signal to invalid process group");
        return Ok(());
    }

    let signal = to_signal(kind);
    match killpg(Pid::from_raw(pgid), signal) {
        Ok(()) => {
            debug!(pgid, signal = %signal, "Signalled process group");
            Ok(())
        }
        Err(Errno::ESRCH) => {
            debug!(pgid, signal = %signal, "Process group already gone");
            Ok(())
        }
        Err(e) => Err(HostError::SignalFailed(format!(
            "Failed to send {} to group {}: {}",
            signal, pgid, e
        ))),
    }
}
