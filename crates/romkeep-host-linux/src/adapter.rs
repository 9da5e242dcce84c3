//! Linux host implementation

use romkeep_host_api::{
    ExitStatus, HostError, HostResult, ProcessHandle, ProcessHost, ProcessState, SignalKind,
    SpawnOptions,
};
use romkeep_util::RomFile;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::process::{signal_group, ManagedProcess};
use crate::procstat::read_process_state;

/// Linux host
pub struct LinuxHost {
    processes: Mutex<HashMap<i32, ManagedProcess>>,
}

impl LinuxHost {
    pub fn new() -> Self {
        Self {
            processes: Mutex::new(HashMap::new()),
        }
    }

    fn processes(&self) -> HostResult<MutexGuard<'_, HashMap<i32, ManagedProcess>>> {
        self.processes
            .lock()
            .map_err(|_| HostError::Internal("process table lock poisoned".into()))
    }
}

impl Default for LinuxHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessHost for LinuxHost {
    fn spawn(
        &self,
        launcher: &Path,
        file: &RomFile,
        options: &SpawnOptions,
    ) -> HostResult<ProcessHandle> {
        let proc = ManagedProcess::spawn(launcher, &[file.as_str()], options)?;
        let handle = ProcessHandle::new(proc.pid, proc.pgid);

        self.processes()?.insert(proc.pid, proc);

        info!(pid = handle.pid, pgid = handle.pgid, file = %file, launcher = %launcher.display(), "Spawned launcher");
        Ok(handle)
    }

    fn signal_group(&self, pgid: i32, kind: SignalKind) -> HostResult<()> {
        signal_group(pgid, kind)
    }

    fn try_wait(&self, handle: &ProcessHandle) -> HostResult<Option<ExitStatus>> {
        let mut procs = self.processes()?;
        let Some(proc) = procs.get_mut(&handle.pid) else {
            return Err(HostError::ProcessNotFound(handle.pid));
        };

        match proc.try_wait() {
            Ok(Some(status)) => {
                procs.remove(&handle.pid);
                info!(pid = handle.pid, status = ?status, "Launcher exited");
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(pid = handle.pid, error = %e, "Error checking process status");
                Err(e)
            }
        }
    }

    fn poll_state(&self, pid: i32) -> ProcessState {
        read_process_state(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn script(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("launch.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn wait_for_exit(host: &LinuxHost, handle: &ProcessHandle) -> ExitStatus {
        for _ in 0..300 {
            if let Some(status) = host.try_wait(handle).unwrap() {
                return status;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("launcher did not exit");
    }

    #[test]
    fn launcher_receives_file_argument() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("arg.txt");
        let launcher = script(dir.path(), &format!("echo \"$1\" > {}", out.display()));

        let host = LinuxHost::new();
        let handle = host
            .spawn(&launcher, &RomFile::new("/roms/GB/a b.gb"), &SpawnOptions::default())
            .unwrap();

        assert!(wait_for_exit(&host, &handle).is_success());
        assert_eq!(std::fs::read_to_string(out).unwrap().trim(), "/roms/GB/a b.gb");
        // reaped leaders are no longer tracked
        assert!(matches!(host.try_wait(&handle), Err(HostError::ProcessNotFound(_))));
    }

    #[test]
    fn stop_and_continue_group() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = script(dir.path(), "exec sleep 60");

        let host = LinuxHost::new();
        let handle = host
            .spawn(&launcher, &RomFile::new("/roms/GB/a.gb"), &SpawnOptions::default())
            .unwrap();

        host.signal_group(handle.pgid, SignalKind::Stop).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(host.poll_state(handle.pid), ProcessState::Stopped);

        host.signal_group(handle.pgid, SignalKind::Cont).unwrap();
        host.signal_group(handle.pgid, SignalKind::Term).unwrap();
        assert!(wait_for_exit(&host, &handle).signaled);
    }

    #[test]
    fn unknown_handle_is_not_found() {
        let host = LinuxHost::new();
        let result = host.try_wait(&ProcessHandle::new(999_999, 999_999));
        assert!(matches!(result, Err(HostError::ProcessNotFound(_))));
    }
}
