//! Scheduler state of arbitrary processes

use romkeep_host_api::ProcessState;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System};

/// Read the scheduler state of any process on the system.
///
/// Only the one pid is refreshed; a pid that does not exist reads as gone.
pub fn read_process_state(pid: i32) -> ProcessState {
    if pid <= 0 {
        return ProcessState::Gone;
    }

    let mut sys = System::new();
    let sys_pid = Pid::from(pid as usize);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
    sys.process(sys_pid)
        .map(|process| state_from_status(process.status()))
        .unwrap_or(ProcessState::Gone)
}

/// Collapse a scheduler status to the three states accounting cares about
pub fn state_from_status(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Stop | ProcessStatus::Tracing => ProcessState::Stopped,
        ProcessStatus::Zombie | ProcessStatus::Dead => ProcessState::Gone,
        _ => ProcessState::Running,
    }
}
