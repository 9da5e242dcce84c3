//! Mock host for testing

use romkeep_util::RomFile;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    ExitStatus, HostError, HostResult, ProcessHandle, ProcessHost, ProcessState, SignalKind,
    SpawnOptions, SwitchCombo,
};

const SIGTERM: i32 = 15;

/// Mock process state for testing
#[derive(Debug, Clone)]
pub struct MockProcess {
    pub launcher: PathBuf,
    pub file: RomFile,
    pub state: ProcessState,
    /// Exit status waiting to be reaped
    pub exit: Option<ExitStatus>,
    /// States `poll_state` reports before falling back to `state`
    pub scripted: VecDeque<ProcessState>,
}

/// Mock host simulating process groups without spawning anything
pub struct MockHost {
    next_pid: AtomicI32,
    processes: Arc<Mutex<HashMap<i32, MockProcess>>>,
    signals: Arc<Mutex<Vec<(i32, SignalKind)>>>,

    /// Configure spawn to fail
    pub fail_spawn: Arc<Mutex<bool>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicI32::new(1000),
            processes: Arc::new(Mutex::new(HashMap::new())),
            signals: Arc::new(Mutex::new(Vec::new())),
            fail_spawn: Arc::new(Mutex::new(false)),
        }
    }

    /// Register a process that was not spawned through this host
    pub fn insert_process(&self, pid: i32, state: ProcessState) {
        self.processes.lock().unwrap().insert(
            pid,
            MockProcess {
                launcher: PathBuf::new(),
                file: RomFile::new(""),
                state,
                exit: None,
                scripted: VecDeque::new(),
            },
        );
    }

    /// Queue states that `poll_state` reports in order
    pub fn script_states(&self, pid: i32, states: impl IntoIterator<Item = ProcessState>) {
        if let Some(process) = self.processes.lock().unwrap().get_mut(&pid) {
            process.scripted.extend(states);
        }
    }

    /// Simulate the group leader exiting
    pub fn simulate_exit(&self, pid: i32, status: ExitStatus) {
        if let Some(process) = self.processes.lock().unwrap().get_mut(&pid) {
            process.state = ProcessState::Gone;
            process.exit = Some(status);
        }
    }

    /// Current simulated state of a process
    pub fn state_of(&self, pid: i32) -> ProcessState {
        self.processes
            .lock()
            .unwrap()
            .get(&pid)
            .map(|p| p.state)
            .unwrap_or(ProcessState::Gone)
    }

    /// Files launched so far, in order of pid
    pub fn launched_files(&self) -> Vec<RomFile> {
        let processes = self.processes.lock().unwrap();
        let mut pids: Vec<_> = processes.keys().copied().collect();
        pids.sort_unstable();
        pids.into_iter()
            .map(|pid| processes[&pid].file.clone())
            .filter(|f| !f.as_str().is_empty())
            .collect()
    }

    /// Every signal sent so far
    pub fn signals(&self) -> Vec<(i32, SignalKind)> {
        self.signals.lock().unwrap().clone()
    }

    /// Signals sent to one process group
    pub fn signals_to(&self, pgid: i32) -> Vec<SignalKind> {
        self.signals()
            .into_iter()
            .filter(|(p, _)| *p == pgid)
            .map(|(_, k)| k)
            .collect()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessHost for MockHost {
    fn spawn(
        &self,
        launcher: &Path,
        file: &RomFile,
        _options: &SpawnOptions,
    ) -> HostResult<ProcessHandle> {
        if *self.fail_spawn.lock().unwrap() {
            return Err(HostError::SpawnFailed("Mock spawn failure".into()));
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.processes.lock().unwrap().insert(
            pid,
            MockProcess {
                launcher: launcher.to_path_buf(),
                file: file.clone(),
                state: ProcessState::Running,
                exit: None,
                scripted: VecDeque::new(),
            },
        );

        Ok(ProcessHandle::new(pid, pid))
    }

    fn signal_group(&self, pgid: i32, kind: SignalKind) -> HostResult<()> {
        if pgid <= 0 {
            return Ok(());
        }

        let mut processes = self.processes.lock().unwrap();
        let Some(process) = processes.get_mut(&pgid) else {
            return Ok(());
        };
        if process.state == ProcessState::Gone {
            return Ok(());
        }

        self.signals.lock().unwrap().push((pgid, kind));
        match kind {
            SignalKind::Stop => process.state = ProcessState::Stopped,
            SignalKind::Cont => process.state = ProcessState::Running,
            SignalKind::Term => {
                process.state = ProcessState::Gone;
                process.exit = Some(ExitStatus::signaled(SIGTERM));
            }
        }
        Ok(())
    }

    fn try_wait(&self, handle: &ProcessHandle) -> HostResult<Option<ExitStatus>> {
        let mut processes = self.processes.lock().unwrap();
        match processes.get_mut(&handle.pid) {
            Some(process) => Ok(process.exit.take()),
            None => Err(HostError::ProcessNotFound(handle.pid)),
        }
    }

    fn poll_state(&self, pid: i32) -> ProcessState {
        let mut processes = self.processes.lock().unwrap();
        match processes.get_mut(&pid) {
            Some(process) => process.scripted.pop_front().unwrap_or(process.state),
            None => ProcessState::Gone,
        }
    }
}

/// Combo that replays a fixed sequence of readings, then stays released
#[derive(Debug, Clone, Default)]
pub struct ScriptedCombo {
    readings: VecDeque<bool>,
}

impl ScriptedCombo {
    pub fn new(readings: impl IntoIterator<Item = bool>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    /// Pressed on the `n`th poll (zero-based)
    pub fn pressed_after(n: usize) -> Self {
        Self::new(std::iter::repeat_n(false, n).chain(std::iter::once(true)))
    }
}

impl SwitchCombo for ScriptedCombo {
    fn pressed(&mut self) -> bool {
        self.readings.pop_front().unwrap_or(false)
    }
}
